//! XIChangeHierarchy - add and remove master devices, attach and detach
//! slave devices

use crate::connection::Display;
use crate::protocol::*;
use std::io::Write;

/// Send one XIChangeHierarchy request carrying `changes` in order.
///
/// The body is sized and encoded before anything is written, so an
/// invalid change or a failed allocation leaves the connection untouched.
pub fn change_hierarchy<S: Write>(
    display: &Display<S>,
    changes: &[HierarchyChange],
) -> XiResult<()> {
    let mut conn = display.lock()?;
    conn.xinput()?;

    let body_len = hierarchy_body_len(changes)?;

    let mut header = conn.allocate_request_header(X_XI_CHANGE_HIERARCHY, CHANGE_HIERARCHY_REQ_SIZE)?;
    header.fields().write_u8(changes.len() as u8)?;
    header.fields().skip(3)?;
    header.set_body_len(body_len)?;

    let body = encode_hierarchy_body(changes, body_len, conn.byte_order())?;

    log::debug!(
        "XIChangeHierarchy: {} changes, {} body bytes",
        changes.len(),
        body.len()
    );

    conn.send_request(header, &body)?;
    conn.sync()
}

/// Like [`change_hierarchy`], for changes in the loosely typed C layout.
///
/// Every record is validated first; one unknown change type fails the whole
/// call before anything is encoded or sent.
pub fn change_hierarchy_raw<S: Write>(
    display: &Display<S>,
    changes: &[HierarchyChangeInfo],
) -> XiResult<()> {
    let changes = changes
        .iter()
        .map(HierarchyChange::try_from)
        .collect::<XiResult<Vec<_>>>()?;
    change_hierarchy(display, &changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ExtensionInfo;

    const XINPUT: ExtensionInfo = ExtensionInfo { major_opcode: 131 };

    fn display() -> Display<Vec<u8>> {
        Display::new(Vec::new(), ByteOrder::LSBFirst, Some(XINPUT))
    }

    #[test]
    fn test_request_header() {
        let display = display();
        let changes = [
            HierarchyChange::add_master("mouse2", true, true),
            HierarchyChange::DetachSlave { device: DeviceId(11) },
        ];
        change_hierarchy(&display, &changes).unwrap();

        let bytes = display.into_stream().unwrap();
        assert_eq!(bytes.len(), 8 + 16 + 8);
        assert_eq!(bytes[0], 131);
        assert_eq!(bytes[1], X_XI_CHANGE_HIERARCHY);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 8);
        assert_eq!(bytes[4], 2);
        assert_eq!(&bytes[5..8], &[0, 0, 0]);
    }

    #[test]
    fn test_empty_changes() {
        let display = display();
        change_hierarchy(&display, &[]).unwrap();
        assert_eq!(
            display.into_stream().unwrap(),
            vec![131, X_XI_CHANGE_HIERARCHY, 2, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_unknown_type_sends_nothing() {
        let display = display();
        let changes = [
            HierarchyChangeInfo {
                change_type: XI_DETACH_SLAVE as i32,
                device: 11,
                ..Default::default()
            },
            HierarchyChangeInfo {
                change_type: 9,
                ..Default::default()
            },
        ];
        let err = change_hierarchy_raw(&display, &changes).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.code(), Some(ErrorCode::Value));
        assert_eq!(display.last_request().unwrap(), 0);
        assert!(display.into_stream().unwrap().is_empty());
    }

    #[test]
    fn test_no_extension() {
        let display = Display::new(Vec::new(), ByteOrder::LSBFirst, None);
        let err = change_hierarchy(&display, &[HierarchyChange::DetachSlave {
            device: DeviceId(4),
        }])
        .unwrap_err();
        assert!(matches!(err, Error::ExtensionUnavailable(XINPUT_EXTENSION_NAME)));
        assert!(display.into_stream().unwrap().is_empty());
    }

    #[test]
    fn test_too_large_for_server() {
        let display = display().with_max_request_length(4);
        let changes = [
            HierarchyChange::DetachSlave { device: DeviceId(4) },
            HierarchyChange::DetachSlave { device: DeviceId(5) },
        ];
        assert!(matches!(
            change_hierarchy(&display, &changes),
            Err(Error::RequestTooLarge { words: 6 })
        ));

        // The lock was released and the connection is still usable
        change_hierarchy(&display, &changes[..1]).unwrap();
        assert_eq!(display.last_request().unwrap(), 1);
    }
}
