//! Event store / codec tests – framing, filtering, failure modes.

#[cfg(test)]
mod tests {
    use dots_validate::types::{codes, fields, tags};
    use dots_validate::{
        codec, Event, EventFile, EventFileWriter, Schema, StoreError, ValidateError, Validator,
        Value,
    };
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    // -----------------------------------------------------------------------
    // Fixtures
    // -----------------------------------------------------------------------

    fn pack(pairs: &[(f32, f32)]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(pairs.len() * 8);
        for (x, y) in pairs {
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
        }
        buf
    }

    fn announce(dots: Vec<u8>, num_dots: i64, time: i64) -> Event {
        let mut map = HashMap::new();
        map.insert(fields::STIM_TYPE.into(), Value::from(tags::MOVING_DOTS));
        map.insert(fields::NUM_DOTS.into(), Value::from(num_dots));
        map.insert(fields::FIELD_RADIUS.into(), Value::from(10.0));
        map.insert(fields::FIELD_CENTER_X.into(), Value::from(0.0));
        map.insert(fields::FIELD_CENTER_Y.into(), Value::from(0.0));
        map.insert(fields::DOTS.into(), Value::Bytes(dots));
        Event::new(codes::ANNOUNCE_STIMULUS, time, Value::Map(map))
    }

    fn write_fixture(dir: &TempDir, name: &str, events: &[Event]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut writer = EventFileWriter::create(&path).unwrap();
        for event in events {
            writer.append(event).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    // -----------------------------------------------------------------------
    // Codec round trips
    // -----------------------------------------------------------------------

    #[test]
    fn record_round_trips_every_value_kind() {
        let mut map = HashMap::new();
        map.insert("null".to_string(), Value::Null);
        map.insert("flag".to_string(), Value::Bool(true));
        map.insert("count".to_string(), Value::Integer(-7));
        map.insert("radius".to_string(), Value::Float(10.5));
        map.insert("tag".to_string(), Value::from(tags::MOVING_DOTS));
        map.insert("raw".to_string(), Value::Bytes(vec![0, 1, 2, 255]));
        map.insert(
            "list".to_string(),
            Value::List(vec![Value::Integer(1), Value::from("two")]),
        );
        let value = Value::Map(map);

        let body = codec::encode_record("#announceStimulus", 1_234_567, &value);
        let (code, time, decoded) = codec::decode_record(&body).unwrap();
        assert_eq!(code, "#announceStimulus");
        assert_eq!(time, 1_234_567);
        assert_eq!(decoded, value);
    }

    #[test]
    fn byte_payloads_survive_unaltered() {
        let dots = pack(&[(1.5, -2.5), (0.0, 10.0)]);
        let body = codec::encode_record("x", 0, &Value::Bytes(dots.clone()));
        let (_, _, decoded) = codec::decode_record(&body).unwrap();
        assert_eq!(decoded, Value::Bytes(dots));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let body = codec::encode_record("x", 0, &Value::from("hello"));
        assert!(matches!(
            codec::decode_record(&body[..body.len() - 2]),
            Err(StoreError::Truncated)
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut body = codec::encode_record("x", 0, &Value::Null);
        body.push(0);
        assert!(matches!(
            codec::decode_record(&body),
            Err(StoreError::TrailingBytes(1))
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut body = codec::encode_record("x", 0, &Value::Null);
        let last = body.len() - 1;
        body[last] = 0x99;
        assert!(matches!(
            codec::decode_record(&body),
            Err(StoreError::UnknownTag(0x99))
        ));
    }

    // -----------------------------------------------------------------------
    // File round trip + lazy filtering
    // -----------------------------------------------------------------------

    #[test]
    fn writer_reader_round_trip_preserves_order_and_time() {
        let dir = TempDir::new().unwrap();
        let events = vec![
            Event::new("#codec", 10, Value::from("trial start")),
            announce(pack(&[(1.0, 1.0)]), 1, 20),
            Event::new("#codec", 30, Value::from("trial end")),
            announce(pack(&[(2.0, 2.0)]), 1, 40),
        ];
        let path = write_fixture(&dir, "session.dotevt", &events);

        let mut file = EventFile::open(&path).unwrap();
        let all: Vec<_> = file.events(&[]).collect::<Result<_, _>>().unwrap();
        assert_eq!(all, events);
    }

    #[test]
    fn iteration_filters_by_code() {
        let dir = TempDir::new().unwrap();
        let events = vec![
            Event::new("#codec", 10, Value::from("trial start")),
            announce(pack(&[(1.0, 1.0)]), 1, 20),
            Event::new("#codec", 30, Value::from("trial end")),
        ];
        let path = write_fixture(&dir, "session.dotevt", &events);

        let mut file = EventFile::open(&path).unwrap();
        let matched: Vec<_> = file
            .events(&[codes::ANNOUNCE_STIMULUS])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].time, 20);
    }

    // -----------------------------------------------------------------------
    // Open failures
    // -----------------------------------------------------------------------

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            EventFile::open(dir.path().join("nonexistent.dotevt")),
            Err(StoreError::Io(_))
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.dotevt");
        std::fs::write(&path, b"NOTEVENT").unwrap();
        assert!(matches!(EventFile::open(&path), Err(StoreError::BadMagic)));
    }

    #[test]
    fn short_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stub.dotevt");
        std::fs::write(&path, b"DOT").unwrap();
        assert!(matches!(EventFile::open(&path), Err(StoreError::BadMagic)));
    }

    // -----------------------------------------------------------------------
    // Mid-stream failures
    // -----------------------------------------------------------------------

    #[test]
    fn truncated_record_surfaces_mid_stream() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "cut.dotevt", &[announce(pack(&[(1.0, 1.0)]), 1, 0)]);

        // Append a record prefix that promises more bytes than exist.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&[0u8; 10]).unwrap();
        drop(file);

        let mut store = EventFile::open(&path).unwrap();
        let results: Vec<_> = store.events(&[]).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(StoreError::Truncated)));
    }

    #[test]
    fn corrupt_length_prefix_fails_before_allocating() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "huge.dotevt", &[]);

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&u32::MAX.to_le_bytes()).unwrap();
        drop(file);

        let mut store = EventFile::open(&path).unwrap();
        let results: Vec<_> = store.events(&[]).collect();
        assert!(matches!(results[0], Err(StoreError::OversizedRecord(_))));
    }

    // -----------------------------------------------------------------------
    // Validator over a real file
    // -----------------------------------------------------------------------

    #[test]
    fn validate_file_counts_matching_events() {
        let dir = TempDir::new().unwrap();
        let events = vec![
            Event::new("#codec", 0, Value::from("trial start")),
            announce(pack(&[(1.0, 2.0), (-3.0, 4.0), (0.0, 0.0)]), 3, 10),
            Event::new("#other", 20, Value::Integer(42)),
            announce(pack(&[(5.0, 5.0)]), 1, 30),
        ];
        let path = write_fixture(&dir, "good.dotevt", &events);

        let report = Validator::new(Schema::Current)
            .validate_file(&path, codes::ANNOUNCE_STIMULUS)
            .unwrap();
        assert_eq!(report.matched, 2);
        assert_eq!(report.schema, Schema::Current);
    }

    #[test]
    fn validate_file_surfaces_open_failures() {
        let dir = TempDir::new().unwrap();
        let result = Validator::new(Schema::Current)
            .validate_file(dir.path().join("missing.dotevt"), codes::ANNOUNCE_STIMULUS);
        assert!(matches!(
            result,
            Err(ValidateError::Store(StoreError::Io(_)))
        ));
    }

    #[test]
    fn validate_file_fails_on_an_out_of_field_dot() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "bad.dotevt",
            &[announce(pack(&[(50.0, 0.0)]), 1, 0)],
        );

        let result =
            Validator::new(Schema::Current).validate_file(&path, codes::ANNOUNCE_STIMULUS);
        assert!(matches!(
            result,
            Err(ValidateError::BoundaryViolation { index: 0, .. })
        ));
    }

    #[test]
    fn report_serializes_with_a_schema_tag() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "one.dotevt", &[announce(pack(&[(0.0, 0.0)]), 1, 0)]);

        let report = Validator::new(Schema::Current)
            .validate_file(&path, codes::ANNOUNCE_STIMULUS)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["matched"], 1);
        assert_eq!(json["schema"], "current");
    }
}
