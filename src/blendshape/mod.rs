//! Facial blend-shape channels and the viseme pose builder.
//!
//! The channel set follows the ARKit face-tracking names so frames can drive
//! a standard avatar rig directly. Each viseme class drives a small fixed set
//! of channels, listed in [`POSE_RULES`]; everything else stays neutral.

use crate::viseme::Viseme;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A named facial deformation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendShape {
    MouthClose,
    MouthFunnel,
    MouthPucker,
    MouthLeft,
    MouthRight,
    MouthSmileLeft,
    MouthSmileRight,
    MouthFrownLeft,
    MouthFrownRight,
    MouthDimpleLeft,
    MouthDimpleRight,
    MouthStretchLeft,
    MouthStretchRight,
    MouthRollLower,
    MouthRollUpper,
    MouthShrugLower,
    MouthShrugUpper,
    MouthPressLeft,
    MouthPressRight,
    MouthLowerDownLeft,
    MouthLowerDownRight,
    MouthUpperUpLeft,
    MouthUpperUpRight,
    BrowDownLeft,
    BrowDownRight,
    BrowInnerUp,
    BrowOuterUpLeft,
    BrowOuterUpRight,
    CheekPuff,
    CheekSquintLeft,
    CheekSquintRight,
    NoseSneerLeft,
    NoseSneerRight,
    TongueOut,
    JawForward,
    JawLeft,
    JawRight,
    JawOpen,
    EyeBlinkLeft,
    EyeBlinkRight,
    EyeLookDownLeft,
    EyeLookDownRight,
    EyeLookInLeft,
    EyeLookInRight,
    EyeLookOutLeft,
    EyeLookOutRight,
    EyeLookUpLeft,
    EyeLookUpRight,
    EyeSquintLeft,
    EyeSquintRight,
    EyeWideLeft,
    EyeWideRight,
}

impl BlendShape {
    /// Number of channels in every pose.
    pub const COUNT: usize = 52;

    /// All channels in wire order.
    pub const ALL: [BlendShape; Self::COUNT] = [
        BlendShape::MouthClose,
        BlendShape::MouthFunnel,
        BlendShape::MouthPucker,
        BlendShape::MouthLeft,
        BlendShape::MouthRight,
        BlendShape::MouthSmileLeft,
        BlendShape::MouthSmileRight,
        BlendShape::MouthFrownLeft,
        BlendShape::MouthFrownRight,
        BlendShape::MouthDimpleLeft,
        BlendShape::MouthDimpleRight,
        BlendShape::MouthStretchLeft,
        BlendShape::MouthStretchRight,
        BlendShape::MouthRollLower,
        BlendShape::MouthRollUpper,
        BlendShape::MouthShrugLower,
        BlendShape::MouthShrugUpper,
        BlendShape::MouthPressLeft,
        BlendShape::MouthPressRight,
        BlendShape::MouthLowerDownLeft,
        BlendShape::MouthLowerDownRight,
        BlendShape::MouthUpperUpLeft,
        BlendShape::MouthUpperUpRight,
        BlendShape::BrowDownLeft,
        BlendShape::BrowDownRight,
        BlendShape::BrowInnerUp,
        BlendShape::BrowOuterUpLeft,
        BlendShape::BrowOuterUpRight,
        BlendShape::CheekPuff,
        BlendShape::CheekSquintLeft,
        BlendShape::CheekSquintRight,
        BlendShape::NoseSneerLeft,
        BlendShape::NoseSneerRight,
        BlendShape::TongueOut,
        BlendShape::JawForward,
        BlendShape::JawLeft,
        BlendShape::JawRight,
        BlendShape::JawOpen,
        BlendShape::EyeBlinkLeft,
        BlendShape::EyeBlinkRight,
        BlendShape::EyeLookDownLeft,
        BlendShape::EyeLookDownRight,
        BlendShape::EyeLookInLeft,
        BlendShape::EyeLookInRight,
        BlendShape::EyeLookOutLeft,
        BlendShape::EyeLookOutRight,
        BlendShape::EyeLookUpLeft,
        BlendShape::EyeLookUpRight,
        BlendShape::EyeSquintLeft,
        BlendShape::EyeSquintRight,
        BlendShape::EyeWideLeft,
        BlendShape::EyeWideRight,
    ];

    /// Position of this channel in [`Self::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Rig-facing channel name (ARKit camelCase).
    pub fn name(self) -> &'static str {
        match self {
            BlendShape::MouthClose => "mouthClose",
            BlendShape::MouthFunnel => "mouthFunnel",
            BlendShape::MouthPucker => "mouthPucker",
            BlendShape::MouthLeft => "mouthLeft",
            BlendShape::MouthRight => "mouthRight",
            BlendShape::MouthSmileLeft => "mouthSmileLeft",
            BlendShape::MouthSmileRight => "mouthSmileRight",
            BlendShape::MouthFrownLeft => "mouthFrownLeft",
            BlendShape::MouthFrownRight => "mouthFrownRight",
            BlendShape::MouthDimpleLeft => "mouthDimpleLeft",
            BlendShape::MouthDimpleRight => "mouthDimpleRight",
            BlendShape::MouthStretchLeft => "mouthStretchLeft",
            BlendShape::MouthStretchRight => "mouthStretchRight",
            BlendShape::MouthRollLower => "mouthRollLower",
            BlendShape::MouthRollUpper => "mouthRollUpper",
            BlendShape::MouthShrugLower => "mouthShrugLower",
            BlendShape::MouthShrugUpper => "mouthShrugUpper",
            BlendShape::MouthPressLeft => "mouthPressLeft",
            BlendShape::MouthPressRight => "mouthPressRight",
            BlendShape::MouthLowerDownLeft => "mouthLowerDownLeft",
            BlendShape::MouthLowerDownRight => "mouthLowerDownRight",
            BlendShape::MouthUpperUpLeft => "mouthUpperUpLeft",
            BlendShape::MouthUpperUpRight => "mouthUpperUpRight",
            BlendShape::BrowDownLeft => "browDownLeft",
            BlendShape::BrowDownRight => "browDownRight",
            BlendShape::BrowInnerUp => "browInnerUp",
            BlendShape::BrowOuterUpLeft => "browOuterUpLeft",
            BlendShape::BrowOuterUpRight => "browOuterUpRight",
            BlendShape::CheekPuff => "cheekPuff",
            BlendShape::CheekSquintLeft => "cheekSquintLeft",
            BlendShape::CheekSquintRight => "cheekSquintRight",
            BlendShape::NoseSneerLeft => "noseSneerLeft",
            BlendShape::NoseSneerRight => "noseSneerRight",
            BlendShape::TongueOut => "tongueOut",
            BlendShape::JawForward => "jawForward",
            BlendShape::JawLeft => "jawLeft",
            BlendShape::JawRight => "jawRight",
            BlendShape::JawOpen => "jawOpen",
            BlendShape::EyeBlinkLeft => "eyeBlinkLeft",
            BlendShape::EyeBlinkRight => "eyeBlinkRight",
            BlendShape::EyeLookDownLeft => "eyeLookDownLeft",
            BlendShape::EyeLookDownRight => "eyeLookDownRight",
            BlendShape::EyeLookInLeft => "eyeLookInLeft",
            BlendShape::EyeLookInRight => "eyeLookInRight",
            BlendShape::EyeLookOutLeft => "eyeLookOutLeft",
            BlendShape::EyeLookOutRight => "eyeLookOutRight",
            BlendShape::EyeLookUpLeft => "eyeLookUpLeft",
            BlendShape::EyeLookUpRight => "eyeLookUpRight",
            BlendShape::EyeSquintLeft => "eyeSquintLeft",
            BlendShape::EyeSquintRight => "eyeSquintRight",
            BlendShape::EyeWideLeft => "eyeWideLeft",
            BlendShape::EyeWideRight => "eyeWideRight",
        }
    }

    /// Look up a channel by its rig-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|shape| shape.name() == name)
    }
}

/// One instant's worth of channel values, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacialPose {
    values: [f32; BlendShape::COUNT],
}

impl Default for FacialPose {
    fn default() -> Self {
        Self::neutral()
    }
}

impl FacialPose {
    /// The all-zero resting face.
    pub const fn neutral() -> Self {
        Self {
            values: [0.0; BlendShape::COUNT],
        }
    }

    /// Value of a single channel.
    pub fn get(&self, shape: BlendShape) -> f32 {
        self.values[shape.index()]
    }

    /// Set a channel, clamped to `[0.0, 1.0]`.
    pub fn set(&mut self, shape: BlendShape, value: f32) {
        self.values[shape.index()] = value.clamp(0.0, 1.0);
    }

    /// Multiply every channel by `factor`, clamping the result.
    pub fn scaled(mut self, factor: f32) -> Self {
        for v in &mut self.values {
            *v = (*v * factor).clamp(0.0, 1.0);
        }
        self
    }

    /// True when every channel is exactly zero.
    pub fn is_neutral(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Channels paired with their values, in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (BlendShape, f32)> + '_ {
        BlendShape::ALL.iter().map(|shape| (*shape, self.get(*shape)))
    }

    /// Raw values in wire order.
    pub fn values(&self) -> &[f32; BlendShape::COUNT] {
        &self.values
    }
}

impl Serialize for FacialPose {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BlendShape::COUNT))?;
        for (shape, value) in self.iter() {
            map.serialize_entry(shape.name(), &value)?;
        }
        map.end()
    }
}

/// Channels driven by a group of viseme classes, with their base weights.
#[derive(Debug, Clone, Copy)]
pub struct PoseRule {
    pub visemes: &'static [Viseme],
    pub channels: &'static [(BlendShape, f32)],
}

/// Per-class channel weights. Classes without a rule (silence, ER, OY, HH)
/// produce the neutral pose.
pub const POSE_RULES: &[PoseRule] = &[
    // Open vowels
    PoseRule {
        visemes: &[Viseme::Aa, Viseme::Ae, Viseme::Ah],
        channels: &[(BlendShape::JawOpen, 0.6), (BlendShape::MouthFunnel, 0.3)],
    },
    // Rounded open (O)
    PoseRule {
        visemes: &[Viseme::Ao, Viseme::Ow],
        channels: &[
            (BlendShape::JawOpen, 0.4),
            (BlendShape::MouthFunnel, 0.7),
            (BlendShape::MouthPucker, 0.5),
        ],
    },
    // Diphthongs
    PoseRule {
        visemes: &[Viseme::Aw, Viseme::Ay],
        channels: &[
            (BlendShape::JawOpen, 0.5),
            (BlendShape::MouthStretchLeft, 0.3),
            (BlendShape::MouthStretchRight, 0.3),
        ],
    },
    // Mid front (E)
    PoseRule {
        visemes: &[Viseme::Eh, Viseme::Ey],
        channels: &[
            (BlendShape::JawOpen, 0.3),
            (BlendShape::MouthSmileLeft, 0.4),
            (BlendShape::MouthSmileRight, 0.4),
        ],
    },
    // High front (I)
    PoseRule {
        visemes: &[Viseme::Ih, Viseme::Iy],
        channels: &[
            (BlendShape::JawOpen, 0.2),
            (BlendShape::MouthStretchLeft, 0.5),
            (BlendShape::MouthStretchRight, 0.5),
        ],
    },
    // Rounded close (U)
    PoseRule {
        visemes: &[Viseme::Uh, Viseme::Uw],
        channels: &[(BlendShape::MouthPucker, 0.7), (BlendShape::JawOpen, 0.2)],
    },
    PoseRule {
        visemes: &[Viseme::Bilabial],
        channels: &[
            (BlendShape::MouthClose, 0.9),
            (BlendShape::MouthPressLeft, 0.5),
            (BlendShape::MouthPressRight, 0.5),
        ],
    },
    PoseRule {
        visemes: &[Viseme::Palatal],
        channels: &[(BlendShape::JawOpen, 0.2), (BlendShape::MouthFunnel, 0.4)],
    },
    PoseRule {
        visemes: &[Viseme::Alveolar],
        channels: &[(BlendShape::JawOpen, 0.3), (BlendShape::MouthRollUpper, 0.3)],
    },
    PoseRule {
        visemes: &[Viseme::Dental],
        channels: &[(BlendShape::JawOpen, 0.3), (BlendShape::TongueOut, 0.5)],
    },
    PoseRule {
        visemes: &[Viseme::Labiodental],
        channels: &[(BlendShape::MouthRollLower, 0.6), (BlendShape::JawOpen, 0.2)],
    },
    PoseRule {
        visemes: &[Viseme::Velar],
        channels: &[(BlendShape::JawOpen, 0.4)],
    },
    PoseRule {
        visemes: &[Viseme::Lateral],
        channels: &[(BlendShape::JawOpen, 0.3), (BlendShape::TongueOut, 0.3)],
    },
    PoseRule {
        visemes: &[Viseme::Rhotic],
        channels: &[(BlendShape::MouthFunnel, 0.4), (BlendShape::JawOpen, 0.3)],
    },
    PoseRule {
        visemes: &[Viseme::Sibilant],
        channels: &[
            (BlendShape::MouthStretchLeft, 0.3),
            (BlendShape::MouthStretchRight, 0.3),
            (BlendShape::JawOpen, 0.1),
        ],
    },
    PoseRule {
        visemes: &[Viseme::DentalFricative],
        channels: &[(BlendShape::JawOpen, 0.2), (BlendShape::TongueOut, 0.4)],
    },
];

/// Driven channels and base weights for a viseme class. Empty for classes
/// that have no rule.
pub fn rule_for(viseme: Viseme) -> &'static [(BlendShape, f32)] {
    POSE_RULES
        .iter()
        .find(|rule| rule.visemes.contains(&viseme))
        .map(|rule| rule.channels)
        .unwrap_or(&[])
}

/// Build the full facial pose for a viseme class at the given intensity.
///
/// Each driven channel is `weight * intensity`; all others stay at zero.
/// Silence always yields the neutral pose, whatever the intensity.
pub fn build_pose(viseme: Viseme, intensity: f32) -> FacialPose {
    let mut pose = FacialPose::neutral();
    if viseme.is_silence() {
        return pose;
    }
    let intensity = intensity.max(0.0);
    for (shape, weight) in rule_for(viseme) {
        pose.set(*shape, weight * intensity);
    }
    pose
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn channel_order_and_names_are_consistent() {
        assert_eq!(BlendShape::ALL.len(), BlendShape::COUNT);
        for (i, shape) in BlendShape::ALL.iter().enumerate() {
            assert_eq!(shape.index(), i);
            assert_eq!(BlendShape::from_name(shape.name()), Some(*shape));
        }
        assert_eq!(BlendShape::ALL[0].name(), "mouthClose");
        assert_eq!(BlendShape::ALL[51].name(), "eyeWideRight");
        assert_eq!(BlendShape::from_name("notAChannel"), None);
    }

    #[test]
    fn silence_is_neutral_at_any_intensity() {
        for intensity in [0.0, 0.5, 1.0, 7.5] {
            assert!(build_pose(Viseme::Sil, intensity).is_neutral());
        }
    }

    #[test]
    fn open_vowel_weights() {
        let pose = build_pose(Viseme::Aa, 0.5);
        assert_close(pose.get(BlendShape::JawOpen), 0.3);
        assert_close(pose.get(BlendShape::MouthFunnel), 0.15);
        assert_eq!(pose.get(BlendShape::MouthPucker), 0.0);
    }

    #[test]
    fn bilabial_weights() {
        let pose = build_pose(Viseme::Bilabial, 1.0);
        assert_close(pose.get(BlendShape::MouthClose), 0.9);
        assert_close(pose.get(BlendShape::MouthPressLeft), 0.5);
        assert_close(pose.get(BlendShape::MouthPressRight), 0.5);
        assert_eq!(pose.get(BlendShape::JawOpen), 0.0);
    }

    #[test]
    fn only_documented_channels_are_driven() {
        for viseme in Viseme::ALL {
            let rule = rule_for(viseme);
            for intensity in [0.25_f32, 0.5, 1.0] {
                let pose = build_pose(viseme, intensity);
                for (shape, value) in pose.iter() {
                    let expected = if viseme.is_silence() {
                        0.0
                    } else {
                        rule.iter()
                            .find(|(s, _)| *s == shape)
                            .map_or(0.0, |(_, w)| w * intensity)
                    };
                    assert_close(value, expected);
                }
            }
        }
    }

    #[test]
    fn unruled_classes_are_neutral() {
        for viseme in [Viseme::Er, Viseme::Oy, Viseme::Glottal] {
            assert!(rule_for(viseme).is_empty());
            assert!(build_pose(viseme, 1.0).is_neutral());
        }
    }

    #[test]
    fn weights_stay_in_documented_range() {
        for rule in POSE_RULES {
            assert!((1..=3).contains(&rule.channels.len()));
            for (_, weight) in rule.channels {
                assert!((0.1..=0.9).contains(weight));
            }
        }
    }

    #[test]
    fn every_viseme_has_at_most_one_rule() {
        for viseme in Viseme::ALL {
            let count = POSE_RULES
                .iter()
                .filter(|r| r.visemes.contains(&viseme))
                .count();
            assert!(count <= 1, "{viseme:?} appears in {count} rules");
        }
    }

    #[test]
    fn pose_values_are_clamped() {
        let pose = build_pose(Viseme::Bilabial, 5.0);
        assert_eq!(pose.get(BlendShape::MouthClose), 1.0);
        let pose = build_pose(Viseme::Aa, -1.0);
        assert!(pose.is_neutral());
    }

    #[test]
    fn scaling_is_uniform() {
        let pose = build_pose(Viseme::Ow, 1.0).scaled(0.6);
        assert_close(pose.get(BlendShape::JawOpen), 0.24);
        assert_close(pose.get(BlendShape::MouthFunnel), 0.42);
        assert_close(pose.get(BlendShape::MouthPucker), 0.3);
    }

    #[test]
    fn serializes_every_channel_by_name() {
        let pose = build_pose(Viseme::Velar, 1.0);
        let json = serde_json::to_value(pose).unwrap();
        let map = json.as_object().unwrap();
        assert_eq!(map.len(), BlendShape::COUNT);
        assert!((map["jawOpen"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(map["eyeBlinkLeft"].as_f64().unwrap(), 0.0);
    }
}
