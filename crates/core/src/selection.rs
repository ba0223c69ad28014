use crate::view::GridView;
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPosition {
    pub row: usize,
    pub column: usize,
}

impl CellPosition {
    #[must_use]
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSelection {
    pub anchor: CellPosition,
    pub end: CellPosition,
}

impl CellSelection {
    #[must_use]
    pub fn single(cell: CellPosition) -> Self {
        Self {
            anchor: cell,
            end: cell,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> (usize, usize, usize, usize) {
        (
            self.anchor.row.min(self.end.row),
            self.anchor.column.min(self.end.column),
            self.anchor.row.max(self.end.row),
            self.anchor.column.max(self.end.column),
        )
    }

    #[must_use]
    pub fn row_span(&self) -> usize {
        let (top, _, bottom, _) = self.bounds();
        bottom - top + 1
    }

    #[must_use]
    pub fn column_span(&self) -> usize {
        let (_, left, _, right) = self.bounds();
        right - left + 1
    }

    #[must_use]
    pub fn contains(&self, cell: CellPosition) -> bool {
        let (top, left, bottom, right) = self.bounds();
        (top..=bottom).contains(&cell.row) && (left..=right).contains(&cell.column)
    }

    pub fn cells(&self) -> impl Iterator<Item = CellPosition> {
        let (top, left, bottom, right) = self.bounds();
        (top..=bottom)
            .flat_map(move |row| (left..=right).map(move |column| CellPosition::new(row, column)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Selecting,
    /// Set by mouse-up; swallows exactly the next click.
    JustFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Cell(CellPosition),
    Chrome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionModel {
    selection: Option<CellSelection>,
    drag: DragState,
}

impl SelectionModel {
    #[must_use]
    pub fn selection(&self) -> Option<CellSelection> {
        self.selection
    }

    #[must_use]
    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    #[must_use]
    pub fn mouse_down(self, cell: CellPosition, extend: bool) -> Self {
        let selection = match (extend, self.selection) {
            (true, Some(existing)) => CellSelection {
                anchor: existing.anchor,
                end: cell,
            },
            _ => CellSelection::single(cell),
        };
        Self {
            selection: Some(selection),
            drag: DragState::Selecting,
        }
    }

    #[must_use]
    pub fn mouse_move(self, cell: CellPosition) -> Self {
        match (self.drag, self.selection) {
            (DragState::Selecting, Some(existing)) => Self {
                selection: Some(CellSelection {
                    anchor: existing.anchor,
                    end: cell,
                }),
                ..self
            },
            _ => self,
        }
    }

    #[must_use]
    pub fn mouse_up(self) -> Self {
        match self.drag {
            DragState::Selecting => Self {
                drag: DragState::JustFinished,
                ..self
            },
            _ => self,
        }
    }

    #[must_use]
    pub fn click(self, target: ClickTarget) -> Self {
        if self.drag == DragState::JustFinished {
            return Self {
                drag: DragState::Idle,
                ..self
            };
        }

        match target {
            ClickTarget::Chrome => Self::default(),
            ClickTarget::Cell(_) => Self {
                drag: DragState::Idle,
                ..self
            },
        }
    }

    #[must_use]
    pub fn select(cell: CellPosition) -> Self {
        Self {
            selection: Some(CellSelection::single(cell)),
            drag: DragState::Idle,
        }
    }

    #[must_use]
    pub fn with_selection(selection: CellSelection) -> Self {
        Self {
            selection: Some(selection),
            drag: DragState::Idle,
        }
    }

    #[must_use]
    pub fn clear(self) -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericAggregate {
    pub count: usize,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionAggregate {
    pub count: usize,
    pub numeric: Option<NumericAggregate>,
}

#[derive(Debug, Clone, Copy)]
struct NumericFold {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl NumericFold {
    fn push(self, number: f64) -> Self {
        Self {
            count: self.count + 1,
            sum: self.sum + number,
            min: self.min.min(number),
            max: self.max.max(number),
        }
    }
}

#[must_use]
pub fn numeric_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(_) => value.as_f64(),
        CellValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite()),
        _ => None,
    }
}

#[must_use]
pub fn aggregate(view: &GridView, selection: &CellSelection) -> SelectionAggregate {
    let initial = (
        0_usize,
        NumericFold {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        },
    );

    let (count, fold) = selection
        .cells()
        .filter_map(|cell| view.cell(cell.row, cell.column))
        .filter(|value| !value.is_absent())
        .fold(initial, |(count, fold), value| {
            let fold = numeric_value(value).map_or(fold, |number| fold.push(number));
            (count + 1, fold)
        });

    let numeric = (fold.count > 0).then(|| NumericAggregate {
        count: fold.count,
        sum: fold.sum,
        avg: fold.sum / fold.count as f64,
        min: fold.min,
        max: fold.max,
    });

    SelectionAggregate { count, numeric }
}
