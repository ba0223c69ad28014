use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_offset: f64,
    pub viewport_height: f64,
}

impl ViewportMetrics {
    #[must_use]
    pub fn new(scroll_offset: f64, viewport_height: f64) -> Self {
        Self {
            scroll_offset,
            viewport_height,
        }
    }
}

pub trait RowSizer {
    fn fixed_height(&self) -> Option<f64>;
    fn estimated_height(&self) -> f64;
    fn measure(&self, index: usize) -> f64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VirtualWindow {
    pub start: usize,
    pub end: usize,
    pub first_visible: usize,
    pub visible_end: usize,
    pub offset_top: f64,
    pub visible_offset: f64,
    pub total_height: f64,
}

impl VirtualWindow {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Default)]
struct HeightTree {
    tree: Vec<f64>,
    heights: Vec<f64>,
}

impl HeightTree {
    fn filled(len: usize, height: f64) -> Self {
        let mut tree = vec![0.0; len + 1];
        for index in 1..=len {
            tree[index] += height;
            let parent = index + lowest_bit(index);
            if parent <= len {
                tree[parent] += tree[index];
            }
        }
        Self {
            tree,
            heights: vec![height; len],
        }
    }

    fn len(&self) -> usize {
        self.heights.len()
    }

    fn set(&mut self, index: usize, height: f64) {
        let Some(previous) = self.heights.get_mut(index) else {
            return;
        };
        let delta = height - *previous;
        *previous = height;

        let mut position = index + 1;
        while position < self.tree.len() {
            self.tree[position] += delta;
            position += lowest_bit(position);
        }
    }

    fn height(&self, index: usize) -> f64 {
        self.heights.get(index).copied().unwrap_or(0.0)
    }

    fn prefix(&self, index: usize) -> f64 {
        let mut position = index.min(self.len());
        let mut sum = 0.0;
        while position > 0 {
            sum += self.tree[position];
            position -= lowest_bit(position);
        }
        sum
    }

    fn total(&self) -> f64 {
        self.prefix(self.len())
    }

    fn find(&self, offset: f64) -> usize {
        let len = self.len();
        let mut position = 0;
        let mut remaining = offset;
        let mut step = len.checked_next_power_of_two().unwrap_or(0);
        while step > 0 {
            let next = position + step;
            if next <= len && self.tree[next] <= remaining {
                position = next;
                remaining -= self.tree[next];
            }
            step /= 2;
        }
        position.min(len.saturating_sub(1))
    }
}

fn lowest_bit(index: usize) -> usize {
    index & index.wrapping_neg()
}

#[derive(Debug, Clone)]
enum Layout {
    Fixed(f64),
    Variable {
        tree: HeightTree,
        measured: Vec<bool>,
    },
}

impl Default for Layout {
    fn default() -> Self {
        Self::Fixed(0.0)
    }
}

/// Keeps cumulative row offsets for one row sequence. Any change to the
/// inputs of the row height function must arrive as a new `revision`.
#[derive(Debug, Clone, Default)]
pub struct Virtualizer {
    revision: Option<u64>,
    row_count: usize,
    layout: Layout,
}

impl Virtualizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, revision: u64, row_count: usize, sizer: &impl RowSizer) {
        if self.revision == Some(revision) && self.row_count == row_count {
            return;
        }

        debug!(revision, row_count, "virtualizer invalidated");
        self.revision = Some(revision);
        self.row_count = row_count;
        self.layout = match sizer.fixed_height() {
            Some(height) => Layout::Fixed(height.max(0.0)),
            None => Layout::Variable {
                tree: HeightTree::filled(row_count, sizer.estimated_height().max(0.0)),
                measured: vec![false; row_count],
            },
        };
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn total_height(&self) -> f64 {
        match &self.layout {
            Layout::Fixed(height) => *height * self.row_count as f64,
            Layout::Variable { tree, .. } => tree.total(),
        }
    }

    #[must_use]
    pub fn row_offset(&self, index: usize) -> f64 {
        match &self.layout {
            Layout::Fixed(height) => *height * index.min(self.row_count) as f64,
            Layout::Variable { tree, .. } => tree.prefix(index),
        }
    }

    #[must_use]
    pub fn row_height(&self, index: usize) -> f64 {
        match &self.layout {
            Layout::Fixed(height) if index < self.row_count => *height,
            Layout::Fixed(_) => 0.0,
            Layout::Variable { tree, .. } => tree.height(index),
        }
    }

    #[must_use]
    pub fn clamp_scroll(&self, scroll_offset: f64, viewport_height: f64) -> f64 {
        let max_scroll = (self.total_height() - viewport_height).max(0.0);
        if scroll_offset.is_finite() {
            scroll_offset.clamp(0.0, max_scroll)
        } else {
            0.0
        }
    }

    pub fn window(
        &mut self,
        viewport: ViewportMetrics,
        overscan: usize,
        sizer: &impl RowSizer,
    ) -> VirtualWindow {
        if self.row_count == 0 {
            return VirtualWindow::default();
        }

        let viewport_height = viewport.viewport_height.max(0.0);
        let scroll = self.clamp_scroll(viewport.scroll_offset, viewport_height);
        let row_count = self.row_count;

        let window = match &mut self.layout {
            Layout::Fixed(height) => fixed_window(*height, row_count, scroll, viewport_height, overscan),
            Layout::Variable { tree, measured } => {
                variable_window(tree, measured, sizer, scroll, viewport_height, overscan)
            }
        };

        trace!(
            start = window.start,
            end = window.end,
            first_visible = window.first_visible,
            total_height = window.total_height,
            "virtual window"
        );
        window
    }
}

fn fixed_window(
    height: f64,
    row_count: usize,
    scroll: f64,
    viewport_height: f64,
    overscan: usize,
) -> VirtualWindow {
    let last = row_count - 1;
    let (first_visible, visible_end) = if height > 0.0 {
        let first = ((scroll / height).floor() as usize).min(last);
        let end = (((scroll + viewport_height) / height).ceil() as usize)
            .max(first + 1)
            .min(row_count);
        (first, end)
    } else {
        (0, row_count)
    };

    let start = first_visible.saturating_sub(overscan);
    let end = visible_end.saturating_add(overscan).min(row_count);
    VirtualWindow {
        start,
        end,
        first_visible,
        visible_end,
        offset_top: start as f64 * height,
        visible_offset: first_visible as f64 * height,
        total_height: row_count as f64 * height,
    }
}

fn variable_window(
    tree: &mut HeightTree,
    measured: &mut [bool],
    sizer: &impl RowSizer,
    scroll: f64,
    viewport_height: f64,
    overscan: usize,
) -> VirtualWindow {
    let row_count = tree.len();
    let mut ensure_measured = |tree: &mut HeightTree, index: usize| {
        if let Some(flag) = measured.get_mut(index) {
            if !*flag {
                *flag = true;
                tree.set(index, sizer.measure(index).max(0.0));
            }
        }
    };

    // Measuring rows above the first visible one moves it, so the overscan
    // above is settled before the final lookup and nothing above it is
    // measured afterwards.
    let guess = tree.find(scroll);
    for index in guess.saturating_sub(overscan)..=guess {
        ensure_measured(tree, index);
    }
    let first_visible = tree.find(scroll);
    ensure_measured(tree, first_visible);

    let bottom = scroll + viewport_height;
    let mut visible_end = first_visible + 1;
    let mut cursor = tree.prefix(visible_end);
    while visible_end < row_count && cursor < bottom {
        ensure_measured(tree, visible_end);
        cursor += tree.height(visible_end);
        visible_end += 1;
    }

    let start = first_visible.saturating_sub(overscan);
    let end = visible_end.saturating_add(overscan).min(row_count);
    for index in visible_end..end {
        ensure_measured(tree, index);
    }

    VirtualWindow {
        start,
        end,
        first_visible,
        visible_end,
        offset_top: tree.prefix(start),
        visible_offset: tree.prefix(first_visible),
        total_height: tree.total(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{HeightTree, RowSizer, ViewportMetrics, Virtualizer};

    struct Fixed(f64);

    impl RowSizer for Fixed {
        fn fixed_height(&self) -> Option<f64> {
            Some(self.0)
        }

        fn estimated_height(&self) -> f64 {
            self.0
        }

        fn measure(&self, _index: usize) -> f64 {
            self.0
        }
    }

    struct Variable {
        measured: Cell<usize>,
    }

    impl Variable {
        fn new() -> Self {
            Self {
                measured: Cell::new(0),
            }
        }
    }

    impl RowSizer for Variable {
        fn fixed_height(&self) -> Option<f64> {
            None
        }

        fn estimated_height(&self) -> f64 {
            10.0
        }

        fn measure(&self, index: usize) -> f64 {
            self.measured.set(self.measured.get() + 1);
            if index % 10 == 0 {
                30.0
            } else {
                10.0
            }
        }
    }

    struct Tall;

    impl RowSizer for Tall {
        fn fixed_height(&self) -> Option<f64> {
            None
        }

        fn estimated_height(&self) -> f64 {
            10.0
        }

        fn measure(&self, _index: usize) -> f64 {
            30.0
        }
    }

    #[test]
    fn height_tree_prefix_and_find_agree() {
        let mut tree = HeightTree::filled(5, 10.0);
        tree.set(2, 25.0);
        assert!((tree.prefix(3) - 45.0).abs() < f64::EPSILON);
        assert!((tree.total() - 65.0).abs() < f64::EPSILON);
        assert_eq!(tree.find(0.0), 0);
        assert_eq!(tree.find(19.9), 1);
        assert_eq!(tree.find(20.0), 2);
        assert_eq!(tree.find(44.9), 2);
        assert_eq!(tree.find(45.0), 3);
        assert_eq!(tree.find(10_000.0), 4);
    }

    #[test]
    fn fixed_path_windows_by_arithmetic() {
        let sizer = Fixed(28.0);
        let mut virtualizer = Virtualizer::new();
        virtualizer.sync(1, 1_000, &sizer);

        let window = virtualizer.window(ViewportMetrics::new(280.0, 280.0), 10, &sizer);
        assert_eq!(window.first_visible, 10);
        assert_eq!(window.visible_end, 20);
        assert_eq!(window.start, 0);
        assert_eq!(window.end, 30);
        assert!((window.visible_offset - 280.0).abs() < f64::EPSILON);
        assert!((window.total_height - 28_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scroll_past_the_end_is_clamped() {
        let sizer = Fixed(10.0);
        let mut virtualizer = Virtualizer::new();
        virtualizer.sync(1, 50, &sizer);

        let window = virtualizer.window(ViewportMetrics::new(9_999.0, 100.0), 2, &sizer);
        assert_eq!(window.visible_end, 50);
        assert_eq!(window.first_visible, 40);
        assert_eq!(window.end, 50);
    }

    #[test]
    fn variable_path_measures_only_the_window() {
        let sizer = Variable::new();
        let mut virtualizer = Virtualizer::new();
        virtualizer.sync(1, 100_000, &sizer);

        let window = virtualizer.window(ViewportMetrics::new(50_000.0, 200.0), 5, &sizer);
        assert!(window.len() <= 40);
        assert!(sizer.measured.get() <= window.len() + 5);
        assert!(window.visible_offset <= 50_000.0);
        assert!(window.visible_offset + virtualizer.row_height(window.first_visible) > 50_000.0);
        assert!(window.total_height > 1_000_000.0);

        let before = sizer.measured.get();
        let again = virtualizer.window(ViewportMetrics::new(50_000.0, 200.0), 5, &sizer);
        assert_eq!(sizer.measured.get(), before);
        assert_eq!(again, window);
    }

    #[test]
    fn first_visible_row_covers_scroll_when_rows_outgrow_the_estimate() {
        let sizer = Tall;
        let mut virtualizer = Virtualizer::new();
        virtualizer.sync(1, 100_000, &sizer);

        for scroll in [50_000.0, 50_003.0, 120_000.0, 10.0] {
            let window = virtualizer.window(ViewportMetrics::new(scroll, 200.0), 5, &sizer);
            let top = window.visible_offset;
            let bottom = top + virtualizer.row_height(window.first_visible);
            assert!(top <= scroll && scroll < bottom, "{scroll}: {top}..{bottom}");
            assert!((top - virtualizer.row_offset(window.first_visible)).abs() < f64::EPSILON);
            assert!(virtualizer.row_offset(window.visible_end) >= scroll + 200.0);
            assert!(window.len() <= 30);
        }
    }

    #[test]
    fn new_revision_discards_measurements() {
        let sizer = Variable::new();
        let mut virtualizer = Virtualizer::new();
        virtualizer.sync(1, 20, &sizer);
        let _ = virtualizer.window(ViewportMetrics::new(0.0, 100.0), 0, &sizer);
        assert!((virtualizer.row_height(0) - 30.0).abs() < f64::EPSILON);

        virtualizer.sync(2, 20, &sizer);
        assert!((virtualizer.row_height(0) - 10.0).abs() < f64::EPSILON);
        assert!((virtualizer.total_height() - 200.0).abs() < f64::EPSILON);

        let fixed = Fixed(5.0);
        virtualizer.sync(3, 20, &fixed);
        assert!((virtualizer.total_height() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sequence_yields_empty_window() {
        let sizer = Fixed(10.0);
        let mut virtualizer = Virtualizer::new();
        virtualizer.sync(1, 0, &sizer);
        assert!(virtualizer
            .window(ViewportMetrics::new(0.0, 100.0), 3, &sizer)
            .is_empty());
    }
}
