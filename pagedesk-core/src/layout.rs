#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Single,
    Double,
}

impl LayoutMode {
    /// Number of page columns, used by fit-width to account for pages
    /// sitting side by side.
    pub fn column_factor(self) -> f32 {
        match self {
            LayoutMode::Single => 1.0,
            LayoutMode::Double => 2.0,
        }
    }
}

/// On-screen rectangle for one page, in canvas points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Whether the rect vertically overlaps the band `[top, bottom)`.
    pub fn overlaps_band(&self, top: f32, bottom: f32) -> bool {
        self.bottom() > top && self.y < bottom
    }

    pub fn contains_y(&self, y: f32) -> bool {
        self.y <= y && y < self.bottom()
    }
}

/// The laid-out page sequence: one rect per page plus the total scrollable
/// extent.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub rects: Vec<PageRect>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Index of the first page whose vertical span contains `y`, if any.
    /// Probes landing in inter-page padding match nothing.
    pub fn page_at(&self, y: f32) -> Option<usize> {
        self.rects.iter().position(|rect| rect.contains_y(y))
    }
}

/// Computes the rectangle for every page and the total extent. Pure function
/// of its inputs: `page_sizes` are oriented native sizes in points, `zoom`
/// scales them, `padding` separates and surrounds pages.
///
/// Single mode stacks pages vertically. Double mode pairs pages left/right;
/// a row is as tall as its taller page, and an odd trailing page occupies a
/// row alone.
pub fn compute_layout(
    page_sizes: &[(f32, f32)],
    zoom: f32,
    mode: LayoutMode,
    padding: f32,
) -> Layout {
    if page_sizes.is_empty() {
        return Layout::default();
    }

    let mut rects = Vec::with_capacity(page_sizes.len());
    let mut current_y = padding;
    let mut row_height = 0.0f32;
    let mut total_width = 0.0f32;
    let last = page_sizes.len() - 1;

    for (i, &(native_width, native_height)) in page_sizes.iter().enumerate() {
        let width = native_width * zoom;
        let height = native_height * zoom;
        let mut x = padding;
        let y = current_y;

        match mode {
            LayoutMode::Single => {
                current_y += height + padding;
                total_width = total_width.max(width + padding * 2.0);
            }
            LayoutMode::Double => {
                let is_right = i % 2 == 1;
                if is_right {
                    let left: &PageRect = &rects[i - 1];
                    x = padding + left.width + padding;
                    row_height = row_height.max(height);
                } else {
                    row_height = height;
                }
                if is_right || i == last {
                    current_y += row_height + padding;
                }
                total_width = total_width.max(x + width + padding);
            }
        }

        rects.push(PageRect {
            x,
            y,
            width,
            height,
        });
    }

    Layout {
        rects,
        width: total_width,
        height: current_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PADDING: f32 = 40.0;

    #[test]
    fn empty_document_has_empty_layout() {
        let layout = compute_layout(&[], 1.0, LayoutMode::Single, PADDING);
        assert!(layout.is_empty());
        assert_eq!(layout.width, 0.0);
        assert_eq!(layout.height, 0.0);
    }

    #[test]
    fn single_mode_stacks_pages_without_overlap() {
        let sizes = vec![(612.0, 792.0), (612.0, 400.0), (300.0, 500.0)];
        let layout = compute_layout(&sizes, 1.5, LayoutMode::Single, PADDING);

        assert_eq!(layout.rects.len(), 3);
        for pair in layout.rects.windows(2) {
            assert!(pair[1].y > pair[0].y, "y-origins must strictly increase");
            assert!(
                pair[1].y >= pair[0].bottom(),
                "pages must not overlap vertically"
            );
        }
    }

    #[test]
    fn single_mode_height_is_sum_of_heights_plus_paddings() {
        let sizes = vec![(612.0, 792.0), (612.0, 400.0), (300.0, 500.0)];
        let zoom = 1.5;
        let layout = compute_layout(&sizes, zoom, LayoutMode::Single, PADDING);

        let scaled_sum: f32 = sizes.iter().map(|&(_, h)| h * zoom).sum();
        let expected = scaled_sum + PADDING * (sizes.len() as f32 + 1.0);
        assert!((layout.height - expected).abs() < 1e-3);
    }

    #[test]
    fn single_mode_width_covers_widest_page() {
        let sizes = vec![(612.0, 792.0), (1000.0, 400.0)];
        let layout = compute_layout(&sizes, 1.0, LayoutMode::Single, PADDING);
        assert_eq!(layout.width, 1000.0 + PADDING * 2.0);
    }

    #[test]
    fn double_mode_pairs_pages_on_rows() {
        let sizes = vec![(600.0, 800.0); 4];
        let layout = compute_layout(&sizes, 1.0, LayoutMode::Double, PADDING);

        // Pairs share a row origin, the right page offset past the left one.
        assert_eq!(layout.rects[0].y, layout.rects[1].y);
        assert_eq!(layout.rects[2].y, layout.rects[3].y);
        assert_eq!(layout.rects[0].x, PADDING);
        assert_eq!(layout.rects[1].x, PADDING + 600.0 + PADDING);
        assert!(layout.rects[2].y > layout.rects[0].bottom());
    }

    #[test]
    fn double_mode_row_height_is_max_of_pair() {
        let sizes = vec![(600.0, 300.0), (600.0, 900.0), (600.0, 100.0)];
        let layout = compute_layout(&sizes, 1.0, LayoutMode::Double, PADDING);

        // Second row starts below the taller right-hand page of row one.
        assert_eq!(layout.rects[2].y, PADDING + 900.0 + PADDING);
    }

    #[test]
    fn double_mode_odd_trailing_page_gets_own_row() {
        let sizes = vec![(600.0, 800.0), (600.0, 800.0), (600.0, 800.0)];
        let layout = compute_layout(&sizes, 1.0, LayoutMode::Double, PADDING);

        assert_eq!(layout.rects[2].x, PADDING);
        assert!(layout.rects[2].y > layout.rects[1].y);
        let expected_height = PADDING + 800.0 + PADDING + 800.0 + PADDING;
        assert!((layout.height - expected_height).abs() < 1e-3);
    }

    #[test]
    fn rotation_swapped_sizes_flow_through() {
        // The engine reports oriented sizes, so a rotated page simply shows
        // up with swapped axes here.
        let portrait = compute_layout(&[(612.0, 792.0)], 1.0, LayoutMode::Single, PADDING);
        let rotated = compute_layout(&[(792.0, 612.0)], 1.0, LayoutMode::Single, PADDING);

        assert_eq!(portrait.rects[0].width, rotated.rects[0].height);
        assert!(rotated.height < portrait.height);
    }

    #[test]
    fn page_at_resolves_probe_positions() {
        let sizes = vec![(612.0, 792.0); 3];
        let layout = compute_layout(&sizes, 1.0, LayoutMode::Single, PADDING);

        assert_eq!(layout.page_at(PADDING + 1.0), Some(0));
        assert_eq!(layout.page_at(layout.rects[1].y + 10.0), Some(1));
        // Probes in the padding gap match nothing.
        assert_eq!(layout.page_at(layout.rects[0].bottom() + 1.0), None);
    }
}
