//! Pointer interaction with a rendered grid: pixel to data conversions, the
//! rubber-band selection and zooming.

mod mapper;
mod selection;
mod zoom;

pub use mapper::{
    mz_to_pixel_y, pixel_x_to_time, pixel_x_to_time_bin_index, pixel_y_to_mz, quantize_pixel_x,
    time_to_pixel_x, InteractionMapper, Viewport,
};
pub use selection::{
    DataRect, DragState, PixelPoint, PixelRect, PointerButton, SelectionRegion,
};
pub use zoom::{selection_to_request, zoom_out_by, zoom_out_full, zoom_to_selection};
