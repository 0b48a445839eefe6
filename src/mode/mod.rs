//! `ContextDetector` / `ModeSelector` (SPEC_FULL §4.5): picks the
//! coordinator's operating mode from board state and (if given) an
//! explicit user request. Explicit requests always win over the
//! board-quality default (§9 design note, resolved in DESIGN.md).

use crate::models::{BoardClass, BoardQualityScore, Mode};

pub struct ModeSelector;

impl ModeSelector {
    pub fn select(score: &BoardQualityScore, explicit_request: Option<Mode>) -> Mode {
        if let Some(mode) = explicit_request {
            return mode;
        }

        match score.class {
            BoardClass::Empty => Mode::Creator,
            BoardClass::Chaotic | BoardClass::Basic => Mode::Enricher,
            BoardClass::Good | BoardClass::Excellent => Mode::Adaptive,
        }
    }
}
