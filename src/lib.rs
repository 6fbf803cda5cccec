/// xinput2-hierarchy - client-side XInput2 device hierarchy requests
///
/// This library encodes XInput2 requests that reshape the input device
/// hierarchy (master and slave devices) and per-device cursors, and sends
/// them over an already established X11 connection.

pub mod protocol;
pub mod connection;
pub mod xi;

pub use protocol::{ByteOrder, Cursor, DeviceId, Error, HierarchyChange, HierarchyChangeInfo, ReturnMode, Window, XiResult};
pub use connection::{Display, ExtensionInfo, Transport};
pub use xi::{change_hierarchy, change_hierarchy_raw, define_device_cursor, undefine_device_cursor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
