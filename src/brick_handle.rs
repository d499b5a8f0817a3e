use bytemuck::{Pod, Zeroable};

use crate::brick_storage::TraceBrickId;
use crate::material::MaterialId;

/// Largest distance value an `Empty` handle can carry (29-bit payload).
pub const MAX_DISTANCE: u32 = (1 << 29) - 1;

const PAYLOAD_MASK: u32 = (1 << 29) - 1;

const TAG_EMPTY: u32 = 0b000;
const TAG_LOADING: u32 = 0b010;
const TAG_LOD: u32 = 0b011;
const TAG_DATA: u32 = 0b100;

/// A decoded cell classification: exactly what `BrickHandle::classify`
/// returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Empty { distance: u32 },
    Data { trace_brick: TraceBrickId },
    Loading,
    Lod { material: MaterialId },
}

/// Tagged 32-bit grid cell word: bits 31..29 select a state, bits 28..0
/// carry that state's payload.
///
/// `classify` is the single authority for decoding this word; nothing else
/// in the crate is allowed to inspect the bit layout directly.
#[repr(transparent)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BrickHandle(pub u32);

impl BrickHandle {
    pub const EMPTY: Self = Self(0);

    pub fn encode(state: HandleState) -> Self {
        match state {
            HandleState::Empty { distance } => Self((TAG_EMPTY << 29) | (distance & PAYLOAD_MASK)),
            HandleState::Loading => Self(TAG_LOADING << 29),
            HandleState::Lod { material } => Self((TAG_LOD << 29) | (material.0 & PAYLOAD_MASK)),
            HandleState::Data { trace_brick } => Self((TAG_DATA << 29) | (trace_brick.0 & PAYLOAD_MASK)),
        }
    }

    pub fn classify(self) -> HandleState {
        let tag = (self.0 >> 29) & 0b111;
        let payload = self.0 & PAYLOAD_MASK;

        // DATA claims every tag with the high bit set (1xx), not just the
        // canonical 100: a decoder must treat 101/110/111 as data too.
        if tag & TAG_DATA != 0 {
            HandleState::Data {
                trace_brick: TraceBrickId(payload),
            }
        } else if tag == TAG_LOADING {
            HandleState::Loading
        } else if tag == TAG_LOD {
            HandleState::Lod {
                material: MaterialId(payload),
            }
        } else {
            debug_assert_eq!(tag, TAG_EMPTY, "tag {tag:03b} is not a defined handle state");
            HandleState::Empty { distance: payload }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_classify_round_trips_for_every_canonical_state() {
        let cases = [
            HandleState::Empty { distance: 0 },
            HandleState::Empty { distance: 42 },
            HandleState::Empty { distance: MAX_DISTANCE },
            HandleState::Loading,
            HandleState::Lod { material: MaterialId(7) },
            HandleState::Data {
                trace_brick: TraceBrickId(12345),
            },
        ];
        for case in cases {
            let handle = BrickHandle::encode(case);
            assert_eq!(handle.classify(), case);
        }
    }

    #[test]
    fn empty_handle_constant_classifies_as_zero_distance() {
        assert_eq!(BrickHandle::EMPTY.classify(), HandleState::Empty { distance: 0 });
    }

    #[test]
    fn any_high_bit_tag_decodes_as_data() {
        let word = BrickHandle((0b111 << 29) | 99);
        assert_eq!(
            word.classify(),
            HandleState::Data {
                trace_brick: TraceBrickId(99)
            }
        );
    }
}
