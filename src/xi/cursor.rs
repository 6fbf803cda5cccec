//! XIChangeCursor - set or clear the cursor a device shows in a window

use crate::connection::Display;
use crate::protocol::*;
use std::io::Write;

/// Make `device` show `cursor` while it is inside `window`.
///
/// [`Cursor::NONE`] makes the window use its parent's cursor again.
pub fn define_device_cursor<S: Write>(
    display: &Display<S>,
    device: DeviceId,
    window: Window,
    cursor: Cursor,
) -> XiResult<()> {
    let mut conn = display.lock()?;

    let mut header = conn.allocate_request_header(X_XI_CHANGE_CURSOR, CHANGE_CURSOR_REQ_SIZE)?;
    header.fields().write_u32(window.id().get())?;
    header.fields().write_u32(cursor.id().get())?;
    header.fields().write_u16(device.get())?;
    header.fields().skip(2)?;

    log::debug!(
        "XIChangeCursor: device={} window={} cursor={}",
        device,
        window.id(),
        cursor.id()
    );

    conn.send_request(header, &[])?;
    conn.sync()
}

/// Clear the cursor of `device` in `window`.
pub fn undefine_device_cursor<S: Write>(
    display: &Display<S>,
    device: DeviceId,
    window: Window,
) -> XiResult<()> {
    define_device_cursor(display, device, window, Cursor::NONE)
}
