//! Action Catalog
//!
//! The closed vocabulary of action blocks a user can drop into a character's
//! queue, and the pure effect each one has on a [`CharacterState`].
//!
//! # Design Philosophy
//!
//! Authoring surfaces deal in display strings ("Move X by 50"). The engine
//! deals in [`ActionVerb`]s. The two meet exactly once, in [`ActionToken::parse`],
//! which looks the string up in the catalog table. Anything that is not in
//! the table is kept verbatim as [`ActionToken::Unknown`] and only reported
//! when a runner reaches it, so authoring stays permissive.
//!
//! The table order is the palette order shown to users.

use rand::Rng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::character::{CharacterState, Position};

/// Distance covered by the move blocks
pub const MOVE_STEP: f64 = 50.0;

/// Text spoken by the say blocks
pub const HELLO: &str = "Hello";

/// Exclusive upper bound for random placement on both axes
pub const DEFAULT_RANDOM_EXTENT: f64 = 200.0;

/// Action verbs, in palette order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionVerb {
    /// `Move X by 50`
    MoveX,
    /// `Move Y by 50`
    MoveY,
    /// `Rotate 180`
    Rotate180,
    /// `Rotate 360`
    Rotate360,
    /// `Go to (0,0)`
    GoToOrigin,
    /// `Move X=50, Y=50`
    MoveXY,
    /// `Go to random position`
    GoToRandom,
    /// `Say Hello`
    SayHello,
    /// `Say Hello for 1 sec`
    SayHelloBriefly,
    /// `Increase Size`
    IncreaseSize,
    /// `Decrease Size`
    DecreaseSize,
    /// `Repeat` (control verb, handled by the runner)
    Repeat,
}

/// How a step is paced after its effect is applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepTiming {
    /// Inter-step delay only
    Standard,
    /// Hold the message for the transient duration, clear it, then the inter-step delay
    TransientMessage,
    /// Not paced (control flow)
    Control,
}

/// Inputs an effect may draw on besides the state itself
pub struct EffectContext<'a> {
    /// Source of randomness for random placement
    pub rng: &'a mut dyn RngCore,
    /// Exclusive upper bound for random coordinates
    pub random_extent: f64,
}

/// Pure state transition for one verb
pub type Effect = fn(&mut CharacterState, &mut EffectContext<'_>);

/// One row of the catalog
pub struct CatalogEntry {
    /// Verb this row describes
    pub verb: ActionVerb,
    /// Display token used by authoring surfaces
    pub token: &'static str,
    /// State transition
    pub effect: Effect,
    /// Pacing after the transition
    pub timing: StepTiming,
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("verb", &self.verb)
            .field("token", &self.token)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

fn move_x(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.position = state.position.offset(MOVE_STEP, 0.0);
}

fn move_y(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.position = state.position.offset(0.0, MOVE_STEP);
}

fn move_xy(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.position = state.position.offset(MOVE_STEP, MOVE_STEP);
}

fn go_to_origin(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.position = Position::ORIGIN;
}

fn go_to_random(state: &mut CharacterState, ctx: &mut EffectContext<'_>) {
    let extent = if ctx.random_extent > 0.0 {
        ctx.random_extent
    } else {
        DEFAULT_RANDOM_EXTENT
    };
    let x = ctx.rng.gen_range(0.0..extent);
    let y = ctx.rng.gen_range(0.0..extent);
    state.position = Position::new(x, y);
}

fn rotate_180(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.rotate(180.0);
}

fn rotate_360(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.rotate(360.0);
}

fn say_hello(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.say(HELLO);
}

fn increase_size(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.grow();
}

fn decrease_size(state: &mut CharacterState, _: &mut EffectContext<'_>) {
    state.shrink();
}

fn no_effect(_: &mut CharacterState, _: &mut EffectContext<'_>) {}

/// The catalog, indexed by `ActionVerb as usize`
static CATALOG: [CatalogEntry; 12] = [
    CatalogEntry {
        verb: ActionVerb::MoveX,
        token: "Move X by 50",
        effect: move_x,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::MoveY,
        token: "Move Y by 50",
        effect: move_y,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::Rotate180,
        token: "Rotate 180",
        effect: rotate_180,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::Rotate360,
        token: "Rotate 360",
        effect: rotate_360,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::GoToOrigin,
        token: "Go to (0,0)",
        effect: go_to_origin,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::MoveXY,
        token: "Move X=50, Y=50",
        effect: move_xy,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::GoToRandom,
        token: "Go to random position",
        effect: go_to_random,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::SayHello,
        token: "Say Hello",
        effect: say_hello,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::SayHelloBriefly,
        token: "Say Hello for 1 sec",
        effect: say_hello,
        timing: StepTiming::TransientMessage,
    },
    CatalogEntry {
        verb: ActionVerb::IncreaseSize,
        token: "Increase Size",
        effect: increase_size,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::DecreaseSize,
        token: "Decrease Size",
        effect: decrease_size,
        timing: StepTiming::Standard,
    },
    CatalogEntry {
        verb: ActionVerb::Repeat,
        token: "Repeat",
        effect: no_effect,
        timing: StepTiming::Control,
    },
];

impl ActionVerb {
    /// Catalog row for this verb
    #[must_use]
    pub fn entry(self) -> &'static CatalogEntry {
        &CATALOG[self as usize]
    }

    /// Display token
    #[must_use]
    pub fn token(self) -> &'static str {
        self.entry().token
    }

    /// Whether this verb steers the runner instead of touching state
    #[must_use]
    pub fn is_control(self) -> bool {
        self.entry().timing == StepTiming::Control
    }

    /// Look a display token up in the catalog
    #[must_use]
    pub fn lookup(token: &str) -> Option<Self> {
        let token = token.trim();
        CATALOG.iter().find(|e| e.token == token).map(|e| e.verb)
    }
}

impl std::fmt::Display for ActionVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// The static catalog
pub struct ActionCatalog;

impl ActionCatalog {
    /// Every catalog row, in palette order
    #[must_use]
    pub fn entries() -> &'static [CatalogEntry] {
        &CATALOG
    }

    /// Blocks an authoring surface offers, in display order
    #[must_use]
    pub fn palette() -> Vec<&'static str> {
        CATALOG.iter().map(|e| e.token).collect()
    }
}

/// A queue entry as authored
///
/// Unknown tokens are kept verbatim so the runner can report them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionToken {
    /// A catalog verb
    Verb(ActionVerb),
    /// Text that matched nothing in the catalog
    Unknown(String),
}

impl ActionToken {
    /// Parse an authored token
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match ActionVerb::lookup(raw) {
            Some(verb) => Self::Verb(verb),
            None => Self::Unknown(raw.to_string()),
        }
    }

    /// The verb, if recognized
    #[must_use]
    pub fn verb(&self) -> Option<ActionVerb> {
        match self {
            Self::Verb(verb) => Some(*verb),
            Self::Unknown(_) => None,
        }
    }

    /// Whether this is the `Repeat` control verb
    #[must_use]
    pub fn is_repeat(&self) -> bool {
        matches!(self, Self::Verb(ActionVerb::Repeat))
    }

    /// Text as authored (catalog token for known verbs)
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Verb(verb) => verb.token(),
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<ActionVerb> for ActionToken {
    fn from(verb: ActionVerb) -> Self {
        Self::Verb(verb)
    }
}

impl From<&str> for ActionToken {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for ActionToken {
    fn from(raw: String) -> Self {
        match ActionVerb::lookup(&raw) {
            Some(verb) => Self::Verb(verb),
            None => Self::Unknown(raw),
        }
    }
}

impl From<ActionToken> for String {
    fn from(token: ActionToken) -> Self {
        match token {
            ActionToken::Verb(verb) => verb.token().to_string(),
            ActionToken::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for ActionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_indexed_by_verb() {
        for (index, entry) in ActionCatalog::entries().iter().enumerate() {
            assert_eq!(entry.verb as usize, index, "row {index} out of order");
        }
    }

    #[test]
    fn test_lookup_every_token() {
        for entry in ActionCatalog::entries() {
            assert_eq!(ActionVerb::lookup(entry.token), Some(entry.verb));
        }
    }

    #[test]
    fn test_lookup_trims_but_is_exact() {
        assert_eq!(ActionVerb::lookup("  Say Hello "), Some(ActionVerb::SayHello));
        assert_eq!(ActionVerb::lookup("say hello"), None);
        assert_eq!(ActionVerb::lookup("Jump"), None);
    }

    #[test]
    fn test_palette_order() {
        let palette = ActionCatalog::palette();
        assert_eq!(palette.len(), 12);
        assert_eq!(palette.first(), Some(&"Move X by 50"));
        assert_eq!(palette.last(), Some(&"Repeat"));
    }

    #[test]
    fn test_unknown_token_kept_verbatim() {
        let token = ActionToken::parse("Dance wildly");
        assert_eq!(token, ActionToken::Unknown("Dance wildly".to_string()));
        assert_eq!(token.verb(), None);
        assert_eq!(token.as_str(), "Dance wildly");
    }

    #[test]
    fn test_token_serde_as_string() {
        let tokens = vec![ActionToken::from(ActionVerb::MoveX), ActionToken::parse("Fly")];
        let json = serde_json::to_string(&tokens).unwrap();
        assert_eq!(json, r#"["Move X by 50","Fly"]"#);

        let back: Vec<ActionToken> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tokens);
    }

    #[test]
    fn test_control_verbs() {
        assert!(ActionVerb::Repeat.is_control());
        assert!(!ActionVerb::SayHelloBriefly.is_control());
        assert!(ActionToken::parse("Repeat").is_repeat());
    }
}
