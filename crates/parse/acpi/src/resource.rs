//! ACPI Resource Data descriptors.
//!
//! Parses and builds the byte-encoded resource descriptors found inside
//! `_CRS`, `_PRS`, and similar ACPI buffer objects. Both small (1-byte tag)
//! and large (3-byte tag) descriptors are handled as defined in ACPI 6.5
//! §6.4. A resource template is a run of descriptors closed by an End Tag
//! whose second byte is a checksum over the whole template (zero means
//! "not checksummed").

use ember_binparse::BinaryReader;

/// Tag byte of the small End Tag descriptor.
pub const END_TAG: u8 = 0x79;

/// Size of an End Tag descriptor.
pub const END_TAG_LEN: usize = 2;

/// Tag byte of the large Generic Register descriptor.
pub const GENERIC_REGISTER_TAG: u8 = 0x82;

/// Size of a Generic Register descriptor.
pub const GENERIC_REGISTER_LEN: usize = 15;

/// Tag byte of the large Extended Interrupt descriptor.
pub const EXTENDED_INTERRUPT_TAG: u8 = 0x89;

/// Size of an Extended Interrupt descriptor without its interrupt list.
const EXTENDED_INTERRUPT_BASE_LEN: usize = 5;

bitflags::bitflags! {
    /// Interrupt vector flags of an Extended Interrupt descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptFlags: u8 {
        /// The device consumes the interrupt (clear: produces it).
        const CONSUMER     = 1 << 0;
        /// Edge-triggered (clear: level-triggered).
        const EDGE         = 1 << 1;
        /// Active-low (clear: active-high).
        const ACTIVE_LOW   = 1 << 2;
        /// Shared with other devices.
        const SHARED       = 1 << 3;
        /// Capable of waking the system.
        const WAKE_CAPABLE = 1 << 4;
    }
}

/// A decoded ACPI resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcpiResource {
    /// I/O port range (small resource tag 0x47).
    Io {
        /// Base I/O port address.
        base: u16,
        /// Number of ports.
        length: u16,
    },
    /// Fixed I/O port range (small resource tag 0x4B).
    FixedIo {
        /// Base I/O port address.
        base: u16,
        /// Number of ports.
        length: u8,
    },
    /// Interrupt line from small IRQ descriptor (tags 0x22/0x23).
    Irq {
        /// IRQ number (0-15).
        irq: u8,
        /// Whether the interrupt is edge-triggered (vs level-triggered).
        edge_triggered: bool,
        /// Whether the interrupt is active-low (vs active-high).
        active_low: bool,
    },
    /// DMA channel (small resource tag 0x2A).
    Dma {
        /// DMA channel number (0-7).
        channel: u8,
        /// Whether the channel supports bus mastering.
        bus_master: bool,
    },
    /// 32-bit memory range (large resource tag 0x85).
    Memory32 {
        /// Base physical address.
        base: u32,
        /// Length in bytes.
        length: u32,
        /// Whether the region is writable.
        writable: bool,
    },
    /// 32-bit fixed memory range (large resource tag 0x86).
    FixedMemory32 {
        /// Base physical address.
        base: u32,
        /// Length in bytes.
        length: u32,
        /// Whether the region is writable.
        writable: bool,
    },
    /// 64-bit memory region from QWord address space (large resource tag 0x8A).
    Memory64 {
        /// Base physical address.
        base: u64,
        /// Length in bytes.
        length: u64,
        /// Whether the region is writable.
        writable: bool,
    },
    /// One interrupt of an Extended Interrupt descriptor (large resource
    /// tag 0x89). A descriptor listing several interrupts yields one item
    /// per interrupt.
    ExtendedIrq {
        /// Global System Interrupt number.
        gsi: u32,
        /// Vector flags shared by every interrupt of the descriptor.
        flags: InterruptFlags,
    },
    /// Generic Register descriptor (large resource tag 0x82).
    GenericRegister {
        /// Address space ID (0 = system memory, 1 = system I/O, ...).
        space_id: u8,
        /// Register width in bits.
        bit_width: u8,
        /// Offset of the register in bits.
        bit_offset: u8,
        /// Access size (0 = undefined, 1 = byte, ... 4 = qword).
        access_size: u8,
        /// Register address in the given space.
        address: u64,
    },
}

/// Interrupts of an Extended Interrupt descriptor not yet yielded.
#[derive(Clone)]
struct PendingIrqs<'a> {
    flags: InterruptFlags,
    remaining: u8,
    list: BinaryReader<'a>,
}

/// Iterator over resource descriptors in a resource template buffer.
#[derive(Clone)]
pub struct ResourceIter<'a> {
    reader: BinaryReader<'a>,
    pending: Option<PendingIrqs<'a>>,
}

impl<'a> ResourceIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            reader: BinaryReader::new(data),
            pending: None,
        }
    }

    fn next_pending_irq(&mut self) -> Option<AcpiResource> {
        let pending = self.pending.as_mut()?;
        let flags = pending.flags;
        let gsi = pending.list.read::<u32>();
        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining == 0 || gsi.is_none() {
            self.pending = None;
        }
        Some(AcpiResource::ExtendedIrq { gsi: gsi?, flags })
    }

    /// Parse a small resource descriptor (bit 7 of tag byte = 0).
    fn parse_small(&mut self, tag_byte: u8) -> Option<AcpiResource> {
        let tag_type = (tag_byte >> 3) & 0x0F;
        let length = usize::from(tag_byte & 0x07);
        let body = self.reader.read_bytes(length)?;
        let mut r = BinaryReader::new(body);

        match tag_type {
            // IRQ, optionally followed by a flags byte.
            0x04 => {
                let mask = r.read::<u16>()?;
                let (edge_triggered, active_low) = match r.read::<u8>() {
                    Some(flags) => (flags & 0x01 != 0, flags & 0x08 != 0),
                    // No flags byte: ISA default, edge-triggered active-high.
                    None => (true, false),
                };
                let irq = mask.trailing_zeros();
                if irq >= 16 {
                    return None;
                }
                Some(AcpiResource::Irq {
                    irq: irq as u8,
                    edge_triggered,
                    active_low,
                })
            }
            0x05 => {
                let channel_mask = r.read::<u8>()?;
                let flags = r.read::<u8>()?;
                let channel = channel_mask.trailing_zeros();
                if channel >= 8 {
                    return None;
                }
                Some(AcpiResource::Dma {
                    channel: channel as u8,
                    bus_master: flags & 0x04 != 0,
                })
            }
            0x08 => {
                let _decode = r.read::<u8>()?;
                let min_base = r.read::<u16>()?;
                let _max_base = r.read::<u16>()?;
                let _alignment = r.read::<u8>()?;
                let range_len = r.read::<u8>()?;
                Some(AcpiResource::Io {
                    base: min_base,
                    length: u16::from(range_len),
                })
            }
            0x09 => {
                let base = r.read::<u16>()?;
                let range_len = r.read::<u8>()?;
                Some(AcpiResource::FixedIo {
                    base,
                    length: range_len,
                })
            }
            _ => None,
        }
    }

    /// Parse a large resource descriptor (bit 7 of tag byte = 1).
    fn parse_large(&mut self, tag_byte: u8) -> Option<AcpiResource> {
        let length = usize::from(self.reader.read::<u16>()?);
        let body = self.reader.read_bytes(length)?;
        let mut r = BinaryReader::new(body);

        match tag_byte & 0x7F {
            0x02 => {
                let space_id = r.read::<u8>()?;
                let bit_width = r.read::<u8>()?;
                let bit_offset = r.read::<u8>()?;
                let access_size = r.read::<u8>()?;
                let address = r.read::<u64>()?;
                Some(AcpiResource::GenericRegister {
                    space_id,
                    bit_width,
                    bit_offset,
                    access_size,
                    address,
                })
            }
            0x05 => {
                let flags = r.read::<u8>()?;
                let min = r.read::<u32>()?;
                let _max = r.read::<u32>()?;
                let _alignment = r.read::<u32>()?;
                let range_len = r.read::<u32>()?;
                Some(AcpiResource::Memory32 {
                    base: min,
                    length: range_len,
                    writable: flags & 0x01 != 0,
                })
            }
            0x06 => {
                let flags = r.read::<u8>()?;
                let base = r.read::<u32>()?;
                let range_len = r.read::<u32>()?;
                Some(AcpiResource::FixedMemory32 {
                    base,
                    length: range_len,
                    writable: flags & 0x01 != 0,
                })
            }
            // DWord address space: memory or I/O ranges only.
            0x07 => {
                let resource_type = r.read::<u8>()?;
                let _general_flags = r.read::<u8>()?;
                let type_flags = r.read::<u8>()?;
                let _granularity = r.read::<u32>()?;
                let min = r.read::<u32>()?;
                let _max = r.read::<u32>()?;
                let _translation = r.read::<u32>()?;
                let range_len = r.read::<u32>()?;
                match resource_type {
                    0 => Some(AcpiResource::Memory32 {
                        base: min,
                        length: range_len,
                        writable: type_flags & 0x01 != 0,
                    }),
                    1 => Some(AcpiResource::Io {
                        base: min as u16,
                        length: range_len as u16,
                    }),
                    _ => None,
                }
            }
            0x09 => {
                let flags = InterruptFlags::from_bits_retain(r.read::<u8>()?);
                let count = r.read::<u8>()?;
                if count == 0 {
                    return None;
                }
                self.pending = Some(PendingIrqs {
                    flags,
                    remaining: count,
                    list: r,
                });
                self.next_pending_irq()
            }
            0x0A => {
                let resource_type = r.read::<u8>()?;
                let _general_flags = r.read::<u8>()?;
                let type_flags = r.read::<u8>()?;
                let _granularity = r.read::<u64>()?;
                let min = r.read::<u64>()?;
                let _max = r.read::<u64>()?;
                let _translation = r.read::<u64>()?;
                let range_len = r.read::<u64>()?;
                if resource_type == 0 {
                    Some(AcpiResource::Memory64 {
                        base: min,
                        length: range_len,
                        writable: type_flags & 0x01 != 0,
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

}

impl Iterator for ResourceIter<'_> {
    type Item = AcpiResource;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(irq) = self.next_pending_irq() {
            return Some(irq);
        }

        loop {
            let tag_byte = self.reader.read::<u8>()?;
            if tag_byte == END_TAG {
                return None;
            }

            let result = if tag_byte & 0x80 != 0 {
                self.parse_large(tag_byte)
            } else {
                self.parse_small(tag_byte)
            };

            if let Some(resource) = result {
                return Some(resource);
            }
            // Unrecognised or empty descriptors are skipped.
            if self.reader.is_at_end() {
                return None;
            }
        }
    }
}

/// Parse a resource template buffer into an iterator of [`AcpiResource`] items.
///
/// `data` is the byte list of a `Buffer` object. The iterator yields
/// resources until the End Tag is encountered or the data is exhausted.
#[must_use]
pub fn parse_resource_template(data: &[u8]) -> ResourceIter<'_> {
    ResourceIter::new(data)
}

/// Returns the total size of the descriptor at the start of `bytes`.
///
/// Returns `None` if `bytes` is empty or the descriptor is truncated.
#[must_use]
pub fn descriptor_len(bytes: &[u8]) -> Option<usize> {
    let tag = *bytes.first()?;
    let len = if tag & 0x80 == 0 {
        1 + usize::from(tag & 0x07)
    } else {
        let body = u16::from_le_bytes([*bytes.get(1)?, *bytes.get(2)?]);
        3 + usize::from(body)
    };
    (len <= bytes.len()).then_some(len)
}

/// Returns `true` if the descriptor at the start of `bytes` is an End Tag.
#[must_use]
pub fn is_end_tag(bytes: &[u8]) -> bool {
    bytes.len() == END_TAG_LEN && bytes[0] == END_TAG
}

/// Iterator over the raw bytes of each descriptor in a resource template.
///
/// Stops after the End Tag, or early if a descriptor is truncated.
#[derive(Clone)]
pub struct DescriptorIter<'a> {
    data: &'a [u8],
    done: bool,
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.done {
            return None;
        }
        let Some(len) = descriptor_len(self.data) else {
            self.done = true;
            return None;
        };
        let (desc, rest) = self.data.split_at(len);
        self.data = rest;
        self.done = is_end_tag(desc);
        Some(desc)
    }
}

/// Splits a resource template into its descriptors.
#[must_use]
pub fn descriptors(data: &[u8]) -> DescriptorIter<'_> {
    DescriptorIter { data, done: false }
}

/// Returns `true` if `data` is exactly a sequence of complete descriptors
/// ending with an End Tag.
#[must_use]
pub fn is_well_terminated(data: &[u8]) -> bool {
    let mut consumed = 0;
    let mut last_was_end = false;
    for desc in descriptors(data) {
        consumed += desc.len();
        last_was_end = is_end_tag(desc);
    }
    last_was_end && consumed == data.len()
}

/// Checks whether the given byte slice looks like a non-empty resource template.
///
/// True when `data` is well terminated and holds at least one descriptor
/// before the End Tag.
#[must_use]
pub fn looks_like_resource_template(data: &[u8]) -> bool {
    is_well_terminated(data) && !is_end_tag(data)
}

/// Encodes an Extended Interrupt descriptor into `out`.
///
/// Returns the number of bytes written, or `None` if `irqs` is empty, has
/// more than 255 entries, or `out` is too small.
pub fn encode_extended_interrupt(
    flags: InterruptFlags,
    irqs: &[u32],
    out: &mut [u8],
) -> Option<usize> {
    let count = u8::try_from(irqs.len()).ok().filter(|&c| c != 0)?;
    let total = extended_interrupt_len(irqs.len());
    let out = out.get_mut(..total)?;

    let body_len = (total - 3) as u16;
    out[0] = EXTENDED_INTERRUPT_TAG;
    out[1..3].copy_from_slice(&body_len.to_le_bytes());
    out[3] = flags.bits();
    out[4] = count;
    for (chunk, irq) in out[EXTENDED_INTERRUPT_BASE_LEN..].chunks_exact_mut(4).zip(irqs) {
        chunk.copy_from_slice(&irq.to_le_bytes());
    }
    Some(total)
}

/// Size of an Extended Interrupt descriptor listing `count` interrupts.
#[must_use]
pub const fn extended_interrupt_len(count: usize) -> usize {
    EXTENDED_INTERRUPT_BASE_LEN + 4 * count
}

/// Encodes a Generic Register descriptor.
#[must_use]
pub fn encode_generic_register(
    space_id: u8,
    bit_width: u8,
    bit_offset: u8,
    access_size: u8,
    address: u64,
) -> [u8; GENERIC_REGISTER_LEN] {
    let mut out = [0u8; GENERIC_REGISTER_LEN];
    out[0] = GENERIC_REGISTER_TAG;
    out[1..3].copy_from_slice(&((GENERIC_REGISTER_LEN - 3) as u16).to_le_bytes());
    out[3] = space_id;
    out[4] = bit_width;
    out[5] = bit_offset;
    out[6] = access_size;
    out[7..].copy_from_slice(&address.to_le_bytes());
    out
}

/// Encodes an End Tag carrying `checksum`.
#[must_use]
pub const fn encode_end_tag(checksum: u8) -> [u8; END_TAG_LEN] {
    [END_TAG, checksum]
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::vec::Vec;

    #[test]
    fn parse_io_descriptor() {
        // I/O descriptor: tag 0x47, decode=1, min=0x03F8, max=0x03F8, align=1, len=8
        let data = [0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, 0x79, 0x00];
        let resources: Vec<_> = parse_resource_template(&data).collect();
        assert_eq!(
            resources,
            &[AcpiResource::Io {
                base: 0x03F8,
                length: 8
            }]
        );
    }

    #[test]
    fn parse_irq_descriptor_with_flags() {
        // tag 0x23 (type 0x04, len 3), mask=0x0010 (IRQ 4), edge + active-low
        let data = [0x23, 0x10, 0x00, 0x09, 0x79, 0x00];
        let resources: Vec<_> = parse_resource_template(&data).collect();
        assert_eq!(
            resources,
            &[AcpiResource::Irq {
                irq: 4,
                edge_triggered: true,
                active_low: true,
            }]
        );
    }

    #[test]
    fn parse_extended_irq_yields_every_interrupt() {
        let data = [
            0x89, 0x0A, 0x00, // tag + length
            0x07, // consumer, edge, active-low
            0x02, // interrupt count
            0x29, 0x00, 0x00, 0x00, // GSI 41
            0x2A, 0x00, 0x00, 0x00, // GSI 42
            0x22, 0x10, 0x00, // IRQ 4
            0x79, 0x00, // end tag
        ];
        let flags = InterruptFlags::CONSUMER | InterruptFlags::EDGE | InterruptFlags::ACTIVE_LOW;
        let resources: Vec<_> = parse_resource_template(&data).collect();
        assert_eq!(
            resources,
            &[
                AcpiResource::ExtendedIrq { gsi: 41, flags },
                AcpiResource::ExtendedIrq { gsi: 42, flags },
                AcpiResource::Irq {
                    irq: 4,
                    edge_triggered: true,
                    active_low: false,
                },
            ]
        );
    }

    #[test]
    fn parse_fixed_memory32_and_register() {
        let mut data = Vec::new();
        data.extend_from_slice(&[
            0x86, 0x09, 0x00, // tag + length
            0x01, // writable
            0x00, 0x00, 0xD0, 0xFE, // base 0xFED00000
            0x00, 0x10, 0x00, 0x00, // length 0x1000
        ]);
        data.extend_from_slice(&encode_generic_register(0, 32, 0, 3, 0x1000_0000));
        data.extend_from_slice(&encode_end_tag(0));

        let resources: Vec<_> = parse_resource_template(&data).collect();
        assert_eq!(
            resources,
            &[
                AcpiResource::FixedMemory32 {
                    base: 0xFED0_0000,
                    length: 0x1000,
                    writable: true,
                },
                AcpiResource::GenericRegister {
                    space_id: 0,
                    bit_width: 32,
                    bit_offset: 0,
                    access_size: 3,
                    address: 0x1000_0000,
                },
            ]
        );
    }

    #[test]
    fn encode_extended_interrupt_layout() {
        let mut out = [0u8; 16];
        let n = encode_extended_interrupt(InterruptFlags::CONSUMER, &[0x20, 0x21], &mut out);
        assert_eq!(n, Some(13));
        assert_eq!(
            &out[..13],
            &[0x89, 0x0A, 0x00, 0x01, 0x02, 0x20, 0, 0, 0, 0x21, 0, 0, 0]
        );
        assert_eq!(descriptor_len(&out[..13]), Some(13));

        assert!(encode_extended_interrupt(InterruptFlags::empty(), &[], &mut out).is_none());
        assert!(encode_extended_interrupt(InterruptFlags::empty(), &[1; 3], &mut out).is_none());
    }

    #[test]
    fn descriptor_splitting() {
        let data = [0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, 0x79, 0x00];
        let lens: Vec<_> = descriptors(&data).map(<[u8]>::len).collect();
        assert_eq!(lens, &[8, 2]);
        assert!(is_well_terminated(&data));
        assert!(is_well_terminated(&[0x79, 0x00]));
        assert!(!is_well_terminated(&data[..9]));
        assert!(!is_well_terminated(&[0x79, 0x00, 0x00]));
        assert!(!is_well_terminated(&[0x86, 0x09]));
        assert_eq!(descriptor_len(&[]), None);
    }

    #[test]
    fn looks_like_resource_template_checks() {
        assert!(looks_like_resource_template(&[
            0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, 0x79, 0x00
        ]));
        assert!(!looks_like_resource_template(&[0x79, 0x00]));
        assert!(!looks_like_resource_template(&[]));
        assert!(!looks_like_resource_template(&[0x00, 0x01, 0x02]));
    }
}
