//! Integration tests for song script compilation
//!
//! These tests compile scripts end to end and check the written assembly or
//! JSON, and play decoded channels back through the stream player.

use chipmml::compiler::context::CompilationContext;
use chipmml::compiler::stream::{Command, CommandReader};
use chipmml::diagnostics::Warning;
use chipmml::effects::runtime::StreamPlayer;
use chipmml::{Compiler, Error, SongScript};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Cursor, Write};
use tempfile::tempdir;

/// Helper to compile a script and return the written JSON
fn compile_to_json(script: &str) -> Value {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("song.json");

    let mut compiler = Compiler::new();
    compiler.json = true;
    compiler
        .compile(Cursor::new(script), &output_path)
        .expect("Compilation failed");

    let text = std::fs::read_to_string(&output_path).expect("Failed to read output");
    serde_json::from_str(&text).expect("Output is not JSON")
}

/// Helper to compile a script and return the written assembly
fn compile_to_asm(script: &str) -> String {
    let dir = tempdir().unwrap();
    let output_path = dir.path().join("song.asm");

    Compiler::new()
        .compile(Cursor::new(script), &output_path)
        .expect("Compilation failed");

    std::fs::read_to_string(&output_path).expect("Failed to read output")
}

fn channel_data(json: &Value, index: usize) -> Vec<u8> {
    json["channels"][index]["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|v| v.as_u64().unwrap() as u8)
        .collect()
}

fn parse(script: &str) -> SongScript {
    SongScript::read(script.as_bytes()).expect("Script did not parse")
}

// =============================================================================
// Note timing and encoding
// =============================================================================

#[test]
fn test_quarter_note_end_to_end() {
    let json = compile_to_json(
        r#"{
            "target": "nes",
            "tempo": 125,
            "channels": {
                "A": [
                    {"cmd": "cutoff", "cutoff": {"policy": "normal", "value": 6}},
                    {"cmd": "note", "pitch": 0, "ticks": 8}
                ]
            }
        }"#,
    );

    assert_eq!(json["target"], "nes");
    assert_eq!(channel_data(&json, 0), vec![0x00, 0x00, 18, 0x0C, 0x00, 6, 0xFF]);
    assert_eq!(json["channels"][0]["frames"], 24);
    assert_eq!(json["channels"][0]["commands"][0]["cmd"], "note");
    assert_eq!(json["channels"][0]["commands"][0]["length"], 18);
    assert_eq!(json["channels"][0]["commands"][1]["cmd"], "rest");
}

#[test]
fn test_melody_with_octaves_and_loop() {
    let json = compile_to_json(
        r#"{
            "target": "cpc",
            "tempo": 150,
            "channels": {
                "B": [
                    {"cmd": "volume", "volume": 12},
                    {"cmd": "loop_point"},
                    {"cmd": "note", "pitch": 0, "ticks": 8},
                    {"cmd": "note", "pitch": 4, "ticks": 8},
                    {"cmd": "octave_up"},
                    {"cmd": "note", "pitch": 0, "ticks": 8},
                    {"cmd": "octave_down"},
                    {"cmd": "block_end"}
                ]
            }
        }"#,
    );

    // 50 Hz at 150 BPM: 2 frames per tick
    assert_eq!(
        channel_data(&json, 1),
        vec![
            0x30, 12,
            0x14, 0x00, 0x00, 16,
            0x84,
            0x20,
            0x14,
            0xF9, 0x02, 0x00,
        ]
    );
    assert_eq!(json["channels"][1]["loop_offset"], 2);
    // untouched channels only hold END
    assert_eq!(channel_data(&json, 0), vec![0xFF]);
}

#[test]
fn test_fractional_target() {
    let json = compile_to_json(
        r#"{
            "target": "genesis",
            "tempo": 125,
            "channels": {"G": [{"cmd": "note", "pitch": 9, "ticks": 8}]}
        }"#,
    );
    // 921 scaled units per tick
    let data = channel_data(&json, 6);
    assert_eq!(data, vec![0x09, 0x1C, 0xC8, 0xFF]);
    assert_eq!(json["channels"][6]["frames"], 28);
}

#[test]
fn test_refresh_override() {
    let json = compile_to_json(
        r#"{
            "target": "nes",
            "tempo": 125,
            "options": {"refresh-hz": 50},
            "channels": {"A": [{"cmd": "note", "pitch": 0, "ticks": 8}]}
        }"#,
    );
    assert_eq!(channel_data(&json, 0), vec![0x00, 0x00, 24, 0xFF]);
}

#[test]
fn test_tuplet_end_to_end() {
    let json = compile_to_json(
        r#"{
            "target": "nes",
            "tempo": 100,
            "channels": {
                "A": [
                    {"cmd": "cutoff", "cutoff": {"policy": "negated_frames", "value": 2}},
                    {"cmd": "tuplet_start"},
                    {"cmd": "note", "pitch": 0, "ticks": 8},
                    {"cmd": "note", "pitch": 4, "ticks": 8},
                    {"cmd": "note", "pitch": 7, "ticks": 8},
                    {"cmd": "tuplet_end", "ticks": 8}
                ]
            }
        }"#,
    );
    // 32 frames: 2 cutoff first, then 30 over three notes
    assert_eq!(
        channel_data(&json, 0),
        vec![0x0C, 0x00, 2, 0x00, 0x00, 10, 0x84, 0x87, 0xFF]
    );
}

// =============================================================================
// Effect macros and tables
// =============================================================================

#[test]
fn test_genesis_packs_adsr_and_modulation() {
    let json = compile_to_json(
        r#"{
            "target": "genesis",
            "effects": [
                {"kind": "adsr", "main": [10, 20, 7]},
                {"kind": "modulation", "main": [6, 4, 3]}
            ],
            "channels": {
                "A": [
                    {"cmd": "effect", "kind": "adsr", "key": 0},
                    {"cmd": "effect", "kind": "modulation", "key": 0}
                ]
            }
        }"#,
    );

    assert_eq!(channel_data(&json, 0), vec![0xE8, 0x00, 0xE7, 0x00, 0xFF]);
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0]["label"], "MOD");
    assert_eq!(tables[0]["entries"][0]["main"], serde_json::json!([6, 0x23]));
    assert_eq!(tables[1]["label"], "ADSR");
    assert_eq!(tables[1]["entries"][0]["main"], serde_json::json!([10, 20, 7, 0x53]));
    assert_eq!(tables[1]["entries"][0]["ref_count"], 1);
}

#[test]
fn test_bad_adsr_arity_is_fatal() {
    let script = parse(
        r#"{
            "target": "sms",
            "effects": [{"kind": "adsr", "main": [1, 2, 3]}]
        }"#,
    );
    assert!(matches!(
        Compiler::new().compile_script(&script),
        Err(Error::ParamArity { expected: 4, found: 3, .. })
    ));
}

#[test]
fn test_unsupported_effect_is_a_warning() {
    let script = parse(
        r#"{
            "target": "nes",
            "effects": [{"kind": "arpeggio", "main": [0, 4, 7]}],
            "channels": {
                "C": [{"cmd": "effect", "kind": "duty_macro", "key": 0}]
            }
        }"#,
    );
    let result = Compiler::new().compile_script(&script).unwrap();
    assert!(matches!(
        result.warnings.as_slice(),
        [Warning::UnsupportedEffect { .. }]
    ));
}

#[test]
fn test_skip_unreferenced_tables_option() {
    let json = compile_to_json(
        r#"{
            "target": "pce",
            "options": {"skip-unreferenced-tables": true},
            "effects": [
                {"kind": "vibrato", "main": [0, 1, 2], "loop": [1, 0]},
                {"kind": "vibrato", "main": [0, 2, 4]}
            ],
            "channels": {"A": [{"cmd": "effect", "kind": "vibrato", "key": 1, "every_note": true}]}
        }"#,
    );
    assert_eq!(channel_data(&json, 0), vec![0xE1, 0x81, 0xFF]);
    let entries = json["tables"][0]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["key"], 1);
}

#[test]
fn test_assembly_output() {
    let asm = compile_to_asm(
        r#"{
            "target": "c64",
            "effects": [{"kind": "adsr", "main": [1, 2, 12, 9]}],
            "channels": {
                "A": [
                    {"cmd": "effect", "kind": "adsr", "key": 0},
                    {"cmd": "note", "pitch": 0, "ticks": 8}
                ]
            }
        }"#,
    );
    assert!(asm.starts_with("; chipmml output for c64"));
    assert!(asm.contains("\t.dw mml_channel_A, mml_channel_B, mml_channel_C\n"));
    // 50 Hz at 120 BPM: 3 frames per tick
    assert!(asm.contains("mml_channel_A:\n\t.db $E8,$00,$00,$00,$18,$FF\n"));
    assert!(asm.contains("mml_ADSR0:\n\t.db $02,$12,$C9\nmml_ADSR0_loop:\n\t.db $00\n"));
}

#[test]
fn test_gnu_as_syntax_for_x68000() {
    let asm = compile_to_asm(r#"{"target": "x68000", "channels": {"H": []}}"#);
    assert!(asm.starts_with("| chipmml output for x68000"));
    assert!(asm.contains("mml_channel_H:\n\t.byte 0xFF\n"));
}

// =============================================================================
// Diagnostics and errors
// =============================================================================

#[test]
fn test_warnings_as_errors() {
    let script = r#"{
        "target": "nes",
        "tempo": 125,
        "channels": {"A": [{"cmd": "note", "pitch": 0, "ticks": 0}]}
    }"#;

    let result = Compiler::new().compile_script(&parse(script)).unwrap();
    assert!(matches!(
        result.warnings.as_slice(),
        [Warning::NoteTooShort { .. }]
    ));

    let mut compiler = Compiler::new();
    compiler.options.warnings_as_errors = true;
    assert!(matches!(
        compiler.compile_script(&parse(script)),
        Err(Error::Promoted(Warning::NoteTooShort { .. }))
    ));
}

#[test]
fn test_negative_cutoff_is_fatal() {
    let script = parse(
        r#"{
            "target": "nes",
            "channels": {
                "A": [
                    {"cmd": "cutoff", "cutoff": {"policy": "normal", "value": 12}},
                    {"cmd": "note", "pitch": 0, "ticks": 8}
                ]
            }
        }"#,
    );
    assert!(matches!(
        Compiler::new().compile_script(&script),
        Err(Error::NegativeLength { .. })
    ));
}

#[test]
fn test_length_mismatch_warning() {
    let script = parse(
        r#"{
            "target": "cpc",
            "channels": {
                "A": [{"cmd": "note", "pitch": 0, "ticks": 16}],
                "B": [{"cmd": "note", "pitch": 0, "ticks": 8}]
            }
        }"#,
    );
    let result = Compiler::new().compile_script(&script).unwrap();
    assert_eq!(
        result.warnings,
        vec![Warning::LengthMismatch {
            channel: "B".to_string(),
            ticks: 8,
            expected: 16,
        }]
    );
}

// =============================================================================
// Input handling
// =============================================================================

#[test]
fn test_compile_gzipped_file() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("song.json.gz");
    let output_path = dir.path().join("song.asm");

    let script = r#"{"target": "sms", "channels": {"A": [{"cmd": "rest", "ticks": 8}]}}"#;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(script.as_bytes()).unwrap();
    std::fs::write(&input_path, encoder.finish().unwrap()).unwrap();

    let result = Compiler::new()
        .compile_file(&input_path, &output_path)
        .expect("Compilation failed");
    assert!(result.warnings.is_empty());
    // 120 BPM at 60 Hz fractional: 960 scaled units per tick
    assert_eq!(result.output.channels[0].data, vec![0x0C, 0x1E, 0x00, 0xFF]);
    assert!(output_path.exists());
}

#[test]
fn test_pattern_channel_is_virtual() {
    let script = parse(
        r#"{
            "target": "nes",
            "pattern": [
                {"cmd": "tempo", "bpm": 60},
                {"cmd": "note", "pitch": 0, "ticks": 8}
            ]
        }"#,
    );
    let result = Compiler::new().compile_script(&script).unwrap();
    let pattern = result.output.channels.last().unwrap();
    assert!(pattern.is_virtual);
    assert_eq!(pattern.name, "pattern");
    // default tempo 120, not 60
    assert_eq!(pattern.data, vec![0x00, 0x00, 24, 0xFF]);
    assert_eq!(result.output.binary_size, 5);
}

#[test]
fn test_decoded_stream_plays_back() {
    let script = parse(
        r#"{
            "target": "nes",
            "tempo": 125,
            "effects": [{"kind": "arpeggio", "main": [0], "loop": [4, 7]}],
            "channels": {
                "A": [
                    {"cmd": "effect", "kind": "arpeggio", "key": 0},
                    {"cmd": "note", "pitch": 0, "ticks": 2},
                    {"cmd": "note", "pitch": 2, "ticks": 2}
                ]
            }
        }"#,
    );
    let result = Compiler::new().compile_script(&script).unwrap();
    let data = &result.output.channels[0].data;
    let commands = CommandReader::new(data).read_all().unwrap();
    assert_eq!(commands[1], Command::Note { pitch: 0, length: 6 });
    assert_eq!(commands[2], Command::NoteShort { pitch: 2 });

    let mut ctx = CompilationContext::default();
    for def in &script.effects {
        ctx.registry_mut(def.kind)
            .define(0, chipmml::effects::ParamList::new(def.main.clone(), def.looped.clone()))
            .unwrap();
    }
    let log = StreamPlayer::new(&ctx, 1, 4).play(&commands).unwrap();
    assert_eq!(log.total_frames, 12);
    assert_eq!(log.pitch_trace, vec![48, 52, 55, 52, 55, 52, 50, 54, 57, 54, 57, 54]);
}

#[test]
fn test_unknown_target_name() {
    assert!(matches!(
        "amiga".parse::<chipmml::target::TargetId>(),
        Err(Error::UnknownTarget(_))
    ));
}
