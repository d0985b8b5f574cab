use crate::interaction::mapper::InteractionMapper;

/// A position in widget pixels
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle with `x0 <= x1` and `y0 <= y1`
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelRect {
    /// The rectangle spanned by two opposite corners, given in either order
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        Self {
            x0: a.x.min(b.x),
            y0: a.y.min(b.y),
            x1: a.x.max(b.x),
            y1: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Whether the rectangle has no area
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
}

/// A region in data coordinates
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataRect {
    pub time_min: f64,
    pub time_max: f64,
    pub mz_min: f64,
    pub mz_max: f64,
}

/// The two ends of a drag in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRegion {
    pub anchor: PixelPoint,
    pub current: PixelPoint,
}

impl SelectionRegion {
    pub fn new(anchor: PixelPoint, current: PixelPoint) -> Self {
        Self { anchor, current }
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect::from_corners(self.anchor, self.current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Tracks the crosshair cursor and rubber-band selection of a grid view.
///
/// A primary press places the cursor and discards the previous selection. Dragging
/// with the primary button first fixes the anchor, then each later drag event moves
/// the far corner and commits the normalized rectangle. Releasing ends the drag
/// but keeps the committed rectangle for [`zoom_to_selection`](crate::interaction::zoom_to_selection).
/// Horizontal positions are snapped to time bin boundaries.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DragState {
    cursor: Option<PixelPoint>,
    anchor: Option<PixelPoint>,
    current: Option<PixelPoint>,
    selection: Option<PixelRect>,
    last_button: Option<PointerButton>,
}

impl DragState {
    pub fn new() -> Self {
        Self::default()
    }

    fn snap(mapper: &InteractionMapper, point: PixelPoint) -> PixelPoint {
        PixelPoint::new(mapper.quantize_x(point.x), point.y)
    }

    pub fn press(&mut self, mapper: &InteractionMapper, button: PointerButton, point: PixelPoint) {
        self.last_button = Some(button);
        if button == PointerButton::Primary {
            self.cursor = Some(Self::snap(mapper, point));
            self.selection = None;
        }
    }

    pub fn drag(&mut self, mapper: &InteractionMapper, point: PixelPoint) {
        if self.last_button != Some(PointerButton::Primary) {
            return;
        }
        let point = Self::snap(mapper, point);
        match self.anchor {
            None => {
                self.anchor = Some(point);
                self.cursor = Some(point);
            }
            Some(anchor) => {
                self.current = Some(point);
                self.selection = Some(PixelRect::from_corners(anchor, point));
            }
        }
    }

    /// Returns `true` when the release should open the view's context menu, which
    /// is what any non-primary button does.
    pub fn release(&mut self, button: PointerButton) -> bool {
        if button != PointerButton::Primary {
            return true;
        }
        self.anchor = None;
        self.current = None;
        false
    }

    pub fn cursor(&self) -> Option<PixelPoint> {
        self.cursor
    }

    /// The drag in progress, if the anchor and far corner are both set
    pub fn region(&self) -> Option<SelectionRegion> {
        self.anchor
            .zip(self.current)
            .map(|(anchor, current)| SelectionRegion::new(anchor, current))
    }

    /// The committed selection rectangle
    pub fn selection(&self) -> Option<PixelRect> {
        self.selection
    }

    pub fn can_zoom_to_selection(&self) -> bool {
        self.selection.is_some()
    }

    /// Forget the committed selection
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }
}
