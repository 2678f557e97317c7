use crate::error::PipelineError;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio::fs;

static CLIP_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("clip name regex"));

/// Clip lengths the video endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ClipSeconds {
    Four,
    Eight,
    Twelve,
}

impl ClipSeconds {
    pub fn as_secs(self) -> u32 {
        match self {
            ClipSeconds::Four => 4,
            ClipSeconds::Eight => 8,
            ClipSeconds::Twelve => 12,
        }
    }

    /// Wire form; the API wants the number as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            ClipSeconds::Four => "4",
            ClipSeconds::Eight => "8",
            ClipSeconds::Twelve => "12",
        }
    }
}

impl TryFrom<u32> for ClipSeconds {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            4 => Ok(ClipSeconds::Four),
            8 => Ok(ClipSeconds::Eight),
            12 => Ok(ClipSeconds::Twelve),
            other => Err(format!("clip seconds must be 4, 8 or 12, got {}", other)),
        }
    }
}

impl From<ClipSeconds> for u32 {
    fn from(value: ClipSeconds) -> Self {
        value.as_secs()
    }
}

impl fmt::Display for ClipSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSpec {
    pub name: String,
    pub seconds: ClipSeconds,
    pub scene: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storyboard {
    pub style_header: String,
    pub clips: Vec<ClipSpec>,
}

impl Storyboard {
    pub fn from_json(text: &str) -> Result<Self> {
        let board: Storyboard =
            serde_json::from_str(text).with_context(|| "Failed to parse storyboard JSON")?;
        board.validate()?;
        Ok(board)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read storyboard: {}", path.as_ref().display()))?;
        Self::from_json(&text)
    }

    /// Full prompt for one clip: the shared header, untouched, then the scene.
    pub fn prompt_for(&self, clip: &ClipSpec) -> String {
        let mut prompt = String::with_capacity(self.style_header.len() + clip.scene.len());
        prompt.push_str(&self.style_header);
        prompt.push_str(&clip.scene);
        prompt
    }

    pub fn total_seconds(&self) -> u32 {
        self.clips.iter().map(|c| c.seconds.as_secs()).sum()
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.clips.is_empty() {
            return Err(PipelineError::Storyboard("no clips".to_string()));
        }

        let mut seen = HashSet::new();
        for clip in &self.clips {
            if !CLIP_NAME_RE.is_match(&clip.name) {
                return Err(PipelineError::Storyboard(format!(
                    "clip name {:?} must be letters, digits, '-' or '_'",
                    clip.name
                )));
            }
            if !seen.insert(clip.name.as_str()) {
                return Err(PipelineError::Storyboard(format!(
                    "duplicate clip name {:?}",
                    clip.name
                )));
            }
            if clip.scene.trim().is_empty() {
                return Err(PipelineError::Storyboard(format!(
                    "clip {} has an empty scene",
                    clip.name
                )));
            }
        }
        Ok(())
    }

    /// The stock five-part, sixty-second horror short.
    pub fn builtin() -> Self {
        let clips = BUILTIN_SCENES
            .iter()
            .map(|(name, scene)| ClipSpec {
                name: (*name).to_string(),
                seconds: ClipSeconds::Twelve,
                scene: (*scene).to_string(),
            })
            .collect();

        Self {
            style_header: STYLE_HEADER.to_string(),
            clips,
        }
    }
}

const STYLE_HEADER: &str = r#"
STYLE / LOOK:
- Horror short film, cinematic, realistic, moody low-key lighting
- Victorian house interior, warm lamplight vs cold hallway darkness
- Slow camera moves, subtle film grain, shallow depth of field
- Sound design notes included (optional)
- Keep characters consistent across all scenes (same wardrobe, hair, age)

CHARACTER CONTINUITY (MUST KEEP IDENTICAL IN ALL CLIPS):
1) SARAH: early 30s, tired but caring mom, pale warm skin tone, shoulder-length dark brown hair slightly messy,
   wearing a soft beige cardigan over a faded blue t-shirt, dark lounge pants.
2) LEO: 7-year-old boy, small frame, curly dark hair, wearing dinosaur-print pajamas, scared wide eyes.
3) THE OTHER MOM: looks like Sarah but uncanny—too-tall silhouette, elongated fingers, NO MOUTH (smooth skin where mouth should be),
   stands in dim hallway shadow; movement is slow, slightly jerky; never fully lit.
SETTING: Old Victorian house, creaky wood floors, narrow hallway, Leo’s bedroom upstairs, staircase, downstairs sofa.
"#;

const BUILTIN_SCENES: &[(&str, &str)] = &[
    (
        "clip01",
        r#"
CLIP 1 (0:00-0:12) — Bedtime dread setup
Camera: Medium close-up of Sarah tucking Leo into bed. Warm bedside lamp glow.
Leo’s eyes keep darting to the cracked door showing a thin slice of dark hallway.
Leo (whisper): "Mom? Is the Other Mom still in the hallway?"
Sarah (soft but firm): "There is no Other Mom. You're safe."
In the hallway sliver: a vague tall shadow shape, barely hinted—no clear reveal.
On-screen text (small): "11:47 PM"
Sound: faint house creaks, distant wind, subtle low drone.
"#,
    ),
    (
        "clip02",
        r#"
CLIP 2 (0:12-0:24) — Sarah dismisses it, but the hallway watches
Camera: Close-up on Sarah’s face as she kisses Leo’s forehead; she looks exhausted.
Cut to POV from inside the room toward the hallway crack: darkness feels "thicker."
Leo (tiny voice): "She looks like you… but her fingers are too long. And she doesn't have a mouth."
Sarah closes the door slowly; the latch clicks loud in the quiet.
As the door shuts, we see—just for a half-second—an elongated hand shape near the frame (ambiguous).
Sound: latch click + a faint wet inhale (not a voice).
"#,
    ),
    (
        "clip03",
        r#"
CLIP 3 (0:24-0:36) — 2:00 AM thump downstairs
Setting: Downstairs living room. Sarah asleep on the sofa, still in the same outfit.
On-screen text: "02:00 AM"
A muffled THUMP from upstairs. Sarah jolts awake, breath sharp.
Camera: Handheld follow as she rushes to the staircase; shadows stretch along the wall.
Upstairs: frantic footsteps across floorboards (suggest Leo running).
Sarah (urgent whisper): "Leo…?"
Sound: thump + running footsteps + creaking stairs + rising bass tension.
"#,
    ),
    (
        "clip04",
        r#"
CLIP 4 (0:36-0:48) — Empty bedroom, closet sob
Camera: Sarah bursts into Leo’s room; she fumbles for the light switch—light flickers weakly.
The bed is messy; sheets tossed. Window shown clearly: LOCKED from inside.
Sarah (alarmed): "Leo! Honey, I'm here!"
She hears a tiny muffled sob from the walk-in closet.
Camera: Tight shot on Sarah’s hand grabbing the closet handle—her fingers tremble.
Sound: light buzz + Leo’s sob + distant house groan.
"#,
    ),
    (
        "clip05",
        r#"
CLIP 5 (0:48-1:00) — Twist + the Other Mom approaches
Camera: Closet open. Leo is curled behind coats, shaking. Same pajamas, tear-streaked face.
Sarah kneels, reaching for him.
Leo shrinks back, staring past Sarah to the open doorway.
Leo (whisper-sob): "Mom… if you’re in here… then who just tucked me back in?"
Sarah freezes. Over her shoulder: hallway darkness.
From the hallway: slow WET dragging sound against carpet.
A voice identical to Sarah but hollow (from darkness): "Go back to sleep, Leo… Mommy’s coming back for the rest of you."
In the hallway shadow: The Other Mom’s silhouette edges into frame—elongated fingers visible; face smooth where mouth should be.
End on BLACK with bold text: "THE OTHER MOM"
Sound: dragging + whisper + sudden silence cutoff.
"#,
    ),
];
