//! XInput2 wire layout and hierarchy change encoding
//!
//! Hierarchy changes are encoded in two passes: the first computes the exact
//! body length (the request header must carry it before any payload is
//! written), the second writes every record into a buffer of that size.

use super::*;

/// Name under which the server advertises the extension
pub const XINPUT_EXTENSION_NAME: &str = "XInputExtension";

/// XInput2 minor opcodes used by this crate
pub const X_XI_CHANGE_CURSOR: u8 = 42;
pub const X_XI_CHANGE_HIERARCHY: u8 = 43;

/// Fixed request sizes in bytes
pub const CHANGE_HIERARCHY_REQ_SIZE: usize = 8;
pub const CHANGE_CURSOR_REQ_SIZE: usize = 16;

/// Fixed hierarchy record sizes in bytes
pub const ADD_MASTER_INFO_SIZE: usize = 8;
pub const REMOVE_MASTER_INFO_SIZE: usize = 12;
pub const ATTACH_SLAVE_INFO_SIZE: usize = 8;
pub const DETACH_SLAVE_INFO_SIZE: usize = 8;

/// Hierarchy change record types
pub const XI_ADD_MASTER: u16 = 1;
pub const XI_REMOVE_MASTER: u16 = 2;
pub const XI_ATTACH_SLAVE: u16 = 3;
pub const XI_DETACH_SLAVE: u16 = 4;

/// RemoveMaster return modes
pub const XI_ATTACH_TO_MASTER: u8 = 1;
pub const XI_FLOATING: u8 = 2;

/// Most changes one request can carry (num_changes is a CARD8)
pub const MAX_CHANGES: usize = u8::MAX as usize;

/// What happens to the slaves of a removed master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMode {
    /// Slaves become floating devices
    Floating,
    /// Slave pointers go to `pointer`, slave keyboards to `keyboard`
    AttachToMaster { pointer: DeviceId, keyboard: DeviceId },
}

impl ReturnMode {
    pub fn code(&self) -> u8 {
        match self {
            ReturnMode::Floating => XI_FLOATING,
            ReturnMode::AttachToMaster { .. } => XI_ATTACH_TO_MASTER,
        }
    }
}

/// One instruction in an XIChangeHierarchy request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyChange {
    /// Create a new master pointer/keyboard pair named `name`
    AddMaster {
        name: String,
        send_core: bool,
        enable: bool,
    },
    RemoveMaster {
        device: DeviceId,
        return_mode: ReturnMode,
    },
    AttachSlave {
        device: DeviceId,
        new_master: DeviceId,
    },
    DetachSlave {
        device: DeviceId,
    },
}

impl HierarchyChange {
    pub fn add_master(name: impl Into<String>, send_core: bool, enable: bool) -> Self {
        HierarchyChange::AddMaster {
            name: name.into(),
            send_core,
            enable,
        }
    }

    pub fn change_type(&self) -> u16 {
        match self {
            HierarchyChange::AddMaster { .. } => XI_ADD_MASTER,
            HierarchyChange::RemoveMaster { .. } => XI_REMOVE_MASTER,
            HierarchyChange::AttachSlave { .. } => XI_ATTACH_SLAVE,
            HierarchyChange::DetachSlave { .. } => XI_DETACH_SLAVE,
        }
    }

    /// Length of the encoded record in bytes, always a multiple of 4.
    pub fn wire_len(&self) -> XiResult<usize> {
        match self {
            HierarchyChange::AddMaster { name, .. } => {
                if name.len() > u16::MAX as usize {
                    return Err(Error::invalid_argument(format!(
                        "master device name of {} bytes does not fit a 16-bit length",
                        name.len()
                    )));
                }
                // Servers read the name as a C string
                if name.contains('\0') {
                    return Err(Error::invalid_argument(
                        "master device name contains a NUL byte",
                    ));
                }
                Ok(ADD_MASTER_INFO_SIZE + padded_len(name.len()))
            }
            HierarchyChange::RemoveMaster { .. } => Ok(REMOVE_MASTER_INFO_SIZE),
            HierarchyChange::AttachSlave { .. } => Ok(ATTACH_SLAVE_INFO_SIZE),
            HierarchyChange::DetachSlave { .. } => Ok(DETACH_SLAVE_INFO_SIZE),
        }
    }

    /// Write this record at the writer's cursor.
    ///
    /// `record_len` is the value returned by [`wire_len`](Self::wire_len);
    /// the cursor ends exactly `record_len` bytes further on.
    fn encode(&self, writer: &mut WireWriter, record_len: usize) -> XiResult<()> {
        let start = writer.offset();

        writer.write_u16(self.change_type())?;
        writer.write_u16((record_len / 4) as u16)?;

        match self {
            HierarchyChange::AddMaster {
                name,
                send_core,
                enable,
            } => {
                writer.write_u16(name.len() as u16)?;
                writer.write_bool(*send_core)?;
                writer.write_bool(*enable)?;
                writer.write_bytes(name.as_bytes())?;
                writer.align()?;
            }
            HierarchyChange::RemoveMaster {
                device,
                return_mode,
            } => {
                writer.write_u16(device.get())?;
                writer.write_u8(return_mode.code())?;
                writer.skip(1)?;
                match return_mode {
                    ReturnMode::AttachToMaster { pointer, keyboard } => {
                        writer.write_u16(pointer.get())?;
                        writer.write_u16(keyboard.get())?;
                    }
                    ReturnMode::Floating => writer.skip(4)?,
                }
            }
            HierarchyChange::AttachSlave { device, new_master } => {
                writer.write_u16(device.get())?;
                writer.write_u16(new_master.get())?;
            }
            HierarchyChange::DetachSlave { device } => {
                writer.write_u16(device.get())?;
                writer.skip(2)?;
            }
        }

        let written = writer.offset() - start;
        if written != record_len {
            return Err(Error::invalid_argument(format!(
                "record type {} encoded to {} bytes, expected {}",
                self.change_type(),
                written,
                record_len
            )));
        }

        log::trace!(
            "XIChangeHierarchy record: type={} length={} words",
            self.change_type(),
            record_len / 4
        );

        Ok(())
    }
}

/// Loosely typed hierarchy change, shaped like the C library's
/// `XIAnyHierarchyChangeInfo`.
///
/// Only the fields relevant to `change_type` are read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyChangeInfo {
    pub change_type: i32,
    pub name: String,
    pub send_core: bool,
    pub enable: bool,
    pub device: i32,
    pub return_mode: i32,
    pub return_pointer: i32,
    pub return_keyboard: i32,
    pub new_master: i32,
}

fn device_id(value: i32, field: &str) -> XiResult<DeviceId> {
    u16::try_from(value)
        .map(DeviceId::new)
        .map_err(|_| Error::invalid_argument(format!("{} {} is not a valid device id", field, value)))
}

impl TryFrom<&HierarchyChangeInfo> for HierarchyChange {
    type Error = Error;

    fn try_from(info: &HierarchyChangeInfo) -> XiResult<Self> {
        match info.change_type {
            t if t == XI_ADD_MASTER as i32 => Ok(HierarchyChange::AddMaster {
                name: info.name.clone(),
                send_core: info.send_core,
                enable: info.enable,
            }),
            t if t == XI_REMOVE_MASTER as i32 => {
                let return_mode = match info.return_mode {
                    m if m == XI_FLOATING as i32 => ReturnMode::Floating,
                    m if m == XI_ATTACH_TO_MASTER as i32 => ReturnMode::AttachToMaster {
                        pointer: device_id(info.return_pointer, "return pointer")?,
                        keyboard: device_id(info.return_keyboard, "return keyboard")?,
                    },
                    m => {
                        return Err(Error::invalid_argument(format!(
                            "unknown return mode {}",
                            m
                        )))
                    }
                };
                Ok(HierarchyChange::RemoveMaster {
                    device: device_id(info.device, "device")?,
                    return_mode,
                })
            }
            t if t == XI_ATTACH_SLAVE as i32 => Ok(HierarchyChange::AttachSlave {
                device: device_id(info.device, "device")?,
                new_master: device_id(info.new_master, "new master")?,
            }),
            t if t == XI_DETACH_SLAVE as i32 => Ok(HierarchyChange::DetachSlave {
                device: device_id(info.device, "device")?,
            }),
            t => Err(Error::invalid_argument(format!(
                "unknown hierarchy change type {}",
                t
            ))),
        }
    }
}

/// Size pass: total body length in bytes of the encoded `changes`.
pub fn hierarchy_body_len(changes: &[HierarchyChange]) -> XiResult<usize> {
    if changes.len() > MAX_CHANGES {
        return Err(Error::invalid_argument(format!(
            "{} hierarchy changes exceed the limit of {} per request",
            changes.len(),
            MAX_CHANGES
        )));
    }

    changes.iter().try_fold(0usize, |total, change| {
        Ok(total + change.wire_len()?)
    })
}

/// Encode pass: write `changes` into a buffer of exactly `body_len` bytes.
pub fn encode_hierarchy_body(
    changes: &[HierarchyChange],
    body_len: usize,
    byte_order: ByteOrder,
) -> XiResult<Vec<u8>> {
    let mut writer = WireWriter::with_len(body_len, byte_order)?;
    for change in changes {
        let record_len = change.wire_len()?;
        change.encode(&mut writer, record_len)?;
    }
    writer.finish()
}

/// Encode the body of an XIChangeHierarchy request, both passes.
pub fn encode_hierarchy_changes(
    changes: &[HierarchyChange],
    byte_order: ByteOrder,
) -> XiResult<Vec<u8>> {
    let body_len = hierarchy_body_len(changes)?;
    encode_hierarchy_body(changes, body_len, byte_order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_le(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    #[test]
    fn test_add_master_padding() {
        // "mouse2": 6 name bytes padded to 8
        let change = HierarchyChange::add_master("mouse2", true, true);
        assert_eq!(change.wire_len().unwrap(), ADD_MASTER_INFO_SIZE + 8);

        let body = encode_hierarchy_changes(&[change], ByteOrder::LSBFirst).unwrap();
        assert_eq!(body.len(), 16);
        assert_eq!(u16_le(&body, 0), XI_ADD_MASTER);
        assert_eq!(u16_le(&body, 2), 4);
        assert_eq!(u16_le(&body, 4), 6);
        assert_eq!(body[6], 1);
        assert_eq!(body[7], 1);
        assert_eq!(&body[8..14], b"mouse2");
        assert_eq!(&body[14..16], &[0, 0]);
    }

    #[test]
    fn test_aligned_name_gets_no_extra_word() {
        let change = HierarchyChange::add_master("abcd", false, true);
        assert_eq!(change.wire_len().unwrap(), ADD_MASTER_INFO_SIZE + 4);

        let empty = HierarchyChange::add_master("", false, false);
        assert_eq!(empty.wire_len().unwrap(), ADD_MASTER_INFO_SIZE);
    }

    #[test]
    fn test_remove_master_floating_zeroes_return_ids() {
        let change = HierarchyChange::RemoveMaster {
            device: DeviceId(12),
            return_mode: ReturnMode::Floating,
        };
        let body = encode_hierarchy_changes(&[change], ByteOrder::LSBFirst).unwrap();
        assert_eq!(body.len(), REMOVE_MASTER_INFO_SIZE);
        assert_eq!(u16_le(&body, 2), 3);
        assert_eq!(u16_le(&body, 4), 12);
        assert_eq!(body[6], XI_FLOATING);
        assert_eq!(&body[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_remove_master_attach_to_master() {
        let change = HierarchyChange::RemoveMaster {
            device: DeviceId(12),
            return_mode: ReturnMode::AttachToMaster {
                pointer: DeviceId(2),
                keyboard: DeviceId(3),
            },
        };
        let body = encode_hierarchy_changes(&[change], ByteOrder::MSBFirst).unwrap();
        assert_eq!(body, vec![0, 2, 0, 3, 0, 12, 1, 0, 0, 2, 0, 3]);
    }

    #[test]
    fn test_attach_and_detach_slave() {
        let changes = [
            HierarchyChange::AttachSlave {
                device: DeviceId(9),
                new_master: DeviceId(2),
            },
            HierarchyChange::DetachSlave { device: DeviceId(10) },
        ];
        let body = encode_hierarchy_changes(&changes, ByteOrder::LSBFirst).unwrap();
        assert_eq!(
            body,
            vec![3, 0, 2, 0, 9, 0, 2, 0, 4, 0, 2, 0, 10, 0, 0, 0]
        );
    }

    #[test]
    fn test_body_len_is_sum_of_records() {
        let changes = vec![
            HierarchyChange::add_master("a", true, true),
            HierarchyChange::add_master("keyboard-of-doom", true, false),
            HierarchyChange::RemoveMaster {
                device: DeviceId(4),
                return_mode: ReturnMode::Floating,
            },
            HierarchyChange::DetachSlave { device: DeviceId(7) },
        ];
        let expected: usize = changes.iter().map(|c| c.wire_len().unwrap()).sum();
        let body_len = hierarchy_body_len(&changes).unwrap();
        assert_eq!(body_len, expected);
        assert_eq!(body_len % 4, 0);
        assert_eq!(
            encode_hierarchy_changes(&changes, ByteOrder::LSBFirst)
                .unwrap()
                .len(),
            body_len
        );
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(hierarchy_body_len(&[]).unwrap(), 0);
        assert!(encode_hierarchy_changes(&[], ByteOrder::LSBFirst)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_too_many_changes() {
        let changes = vec![HierarchyChange::DetachSlave { device: DeviceId(5) }; MAX_CHANGES + 1];
        assert!(matches!(
            hierarchy_body_len(&changes),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_name_too_long() {
        let change = HierarchyChange::add_master("x".repeat(u16::MAX as usize + 1), true, true);
        assert!(matches!(change.wire_len(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_name_with_nul_is_rejected() {
        let change = HierarchyChange::add_master("mouse\0two", true, true);
        let err = change.wire_len().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.code(), Some(ErrorCode::Value));
        assert!(matches!(
            hierarchy_body_len(&[change]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_info_conversion() {
        let info = HierarchyChangeInfo {
            change_type: XI_ATTACH_SLAVE as i32,
            device: 9,
            new_master: 2,
            ..Default::default()
        };
        assert_eq!(
            HierarchyChange::try_from(&info).unwrap(),
            HierarchyChange::AttachSlave {
                device: DeviceId(9),
                new_master: DeviceId(2),
            }
        );

        let unknown = HierarchyChangeInfo {
            change_type: 17,
            ..Default::default()
        };
        assert!(matches!(
            HierarchyChange::try_from(&unknown),
            Err(Error::InvalidArgument(_))
        ));

        let bad_device = HierarchyChangeInfo {
            change_type: XI_DETACH_SLAVE as i32,
            device: -1,
            ..Default::default()
        };
        assert!(HierarchyChange::try_from(&bad_device).is_err());
    }

    #[test]
    fn test_info_floating_ignores_return_ids() {
        let info = HierarchyChangeInfo {
            change_type: XI_REMOVE_MASTER as i32,
            device: 4,
            return_mode: XI_FLOATING as i32,
            return_pointer: -7,
            return_keyboard: 99999,
            ..Default::default()
        };
        assert_eq!(
            HierarchyChange::try_from(&info).unwrap(),
            HierarchyChange::RemoveMaster {
                device: DeviceId(4),
                return_mode: ReturnMode::Floating,
            }
        );
    }
}
