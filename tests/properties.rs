//! Property-based tests for note timing, length operands, tuplet
//! distribution and macro registration.
//!
//! ```bash
//! cargo test --test properties
//! ```

use proptest::prelude::*;

use chipmml::chips::ChipId;
use chipmml::compiler::channel::{distribute_frames, Channel, Pitch};
use chipmml::compiler::context::CompilationContext;
use chipmml::compiler::stream::{decode_length, split_length, CommandReader};
use chipmml::compiler::timing::{max_length, note_length, Cutoff, FrameClock};
use chipmml::effects::runtime::StreamPlayer;
use chipmml::effects::{EffectKind, EffectRegistry, ParamList};

fn clock() -> impl Strategy<Value = FrameClock> {
    (prop_oneof![Just(50u32), Just(60u32)], any::<bool>())
        .prop_map(|(hz, fractional)| FrameClock::new(hz, fractional))
}

fn cutoff() -> impl Strategy<Value = Cutoff> {
    prop_oneof![
        (0..=8i32).prop_map(Cutoff::Normal),
        (0..=8i32).prop_map(Cutoff::Negated),
        (0..=100i32).prop_map(Cutoff::Frames),
        (0..=100i32).prop_map(Cutoff::NegatedFrames),
    ]
}

// ============================================================================
// 1. Note timing
// ============================================================================

proptest! {
    /// The cutoff split never loses or invents time.
    #[test]
    fn active_plus_cutoff_is_total(
        ticks in 0u32..=256,
        tempo in 30u32..=300,
        clock in clock(),
        cutoff in cutoff(),
    ) {
        let len = note_length(ticks, tempo, clock, cutoff).unwrap();
        prop_assert_eq!(len.active + len.cutoff, len.total);
        prop_assert!(len.cutoff >= 0);
        prop_assert!(len.active <= max_length(clock.scale()));
    }

    /// Normal(8) never cuts; Normal(0) cuts everything.
    #[test]
    fn full_and_silent_cutoffs(ticks in 0u32..=256, tempo in 30u32..=300, clock in clock()) {
        let full = note_length(ticks, tempo, clock, Cutoff::Normal(8)).unwrap();
        prop_assert_eq!(full.cutoff, 0);
        let silent = note_length(ticks, tempo, clock, Cutoff::Normal(0)).unwrap();
        prop_assert_eq!(silent.cutoff, silent.total);
        prop_assert_eq!(silent.active, 0);
    }
}

// ============================================================================
// 2. Length operands
// ============================================================================

proptest! {
    /// Every representable length decodes back to itself.
    #[test]
    fn split_length_round_trips(fractional in any::<bool>(), seed in 0u32..=u32::MAX) {
        let scale = if fractional { 256 } else { 1 };
        let n = i64::from(seed) % (max_length(scale) + 1);
        let bytes = split_length(n, scale);
        prop_assert_eq!(bytes.len(), if n <= 127 * scale { 2 } else { 3 });
        prop_assert_eq!(decode_length(&bytes), Some((n, bytes.len())));
    }
}

#[test]
fn split_length_boundaries() {
    for n in [0, 1, 127, 128, 16383] {
        let bytes = split_length(n, 1);
        assert_eq!(decode_length(&bytes), Some((n, bytes.len())), "n = {}", n);
    }
}

// ============================================================================
// 3. Tuplet distribution
// ============================================================================

proptest! {
    /// Frames are conserved and spread as evenly as possible.
    #[test]
    fn distribution_is_exact_and_even(
        total in 0i64..=100_000,
        timed in prop::collection::vec(any::<bool>(), 1..24)
            .prop_filter("needs a timed entry", |t| t.contains(&true)),
    ) {
        let frames = distribute_frames(total, &timed);
        prop_assert_eq!(frames.len(), timed.len());
        prop_assert_eq!(frames.iter().sum::<i64>(), total);

        let played: Vec<i64> = frames
            .iter()
            .zip(&timed)
            .filter(|(_, t)| **t)
            .map(|(f, _)| *f)
            .collect();
        let min = played.iter().min().copied().unwrap_or(0);
        let max = played.iter().max().copied().unwrap_or(0);
        prop_assert!(max - min <= 1);

        for (f, t) in frames.iter().zip(&timed) {
            if !*t {
                prop_assert_eq!(*f, 0);
            }
        }
    }
}

// ============================================================================
// 4. Registry dedup
// ============================================================================

proptest! {
    #[test]
    fn equal_lists_share_a_key(
        main_a in prop::collection::vec(-128i64..=127, 0..8),
        loop_a in prop::collection::vec(-128i64..=127, 0..4),
        main_b in prop::collection::vec(-128i64..=127, 0..8),
        loop_b in prop::collection::vec(-128i64..=127, 0..4),
    ) {
        let mut reg = EffectRegistry::new(EffectKind::Arpeggio);
        let a = ParamList::from_ints(&main_a, &loop_a);
        let b = ParamList::from_ints(&main_b, &loop_b);

        let ka = reg.register(a.clone()).unwrap();
        let kb = reg.register(b.clone()).unwrap();
        prop_assert_eq!(reg.register(a.clone()).unwrap(), ka);
        if a == b {
            prop_assert_eq!(ka, kb);
        } else {
            prop_assert_ne!(ka, kb);
        }
    }
}

// ============================================================================
// 5. Encoder and player agree
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Note { pitch: u8, octave: u8, ticks: u32 },
    Rest { ticks: u32 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0u8..12, 1u8..=7, 1u32..=32)
            .prop_map(|(pitch, octave, ticks)| Step::Note { pitch, octave, ticks }),
        1 => (1u32..=64).prop_map(|ticks| Step::Rest { ticks }),
    ]
}

proptest! {
    /// Playing the decoded stream starts the notes that were written, in the
    /// octaves they were written in, and takes as long as the channel says.
    #[test]
    fn decoded_stream_replays_notes(
        steps in prop::collection::vec(step(), 1..40),
        tempo in 60u32..=240,
        clock in clock(),
        cut in 1i32..=8,
    ) {
        let mut ctx = CompilationContext::default();
        let mut ch = Channel::new("A", ChipId::Apu2A03.channel_caps(), clock, tempo);
        ch.set_cutoff(Cutoff::Normal(cut), &mut ctx).unwrap();

        let mut expected = Vec::new();
        for s in &steps {
            match *s {
                Step::Note { pitch, octave, ticks } => {
                    ch.set_octave(i32::from(octave)).unwrap();
                    ch.add_note(Pitch::Note(pitch), ticks, &mut ctx).unwrap();
                    expected.push((pitch, octave));
                }
                Step::Rest { ticks } => ch.add_note(Pitch::Rest, ticks, &mut ctx).unwrap(),
            }
        }
        ch.finish(&mut ctx).unwrap();

        let commands = CommandReader::new(ch.data()).read_all().unwrap();
        let log = StreamPlayer::new(&ctx, ch.scale(), 4).play(&commands).unwrap();

        let played: Vec<(u8, u8)> = log.notes.iter().map(|n| (n.pitch, n.octave)).collect();
        prop_assert_eq!(played, expected);
        prop_assert_eq!(log.total_frames, ch.frames());
    }
}
