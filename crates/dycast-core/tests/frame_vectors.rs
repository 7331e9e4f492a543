//! Frame codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use dycast_core::protocol::{decode_frame, decode_response, encode_frame};

use vector_loader::load;

#[test]
fn frame_vectors() {
    let files = [
        "frame_heartbeat.json",
        "frame_header_last_wins.json",
        "frame_ids.json",
        "frame_unknown_fields.json",
        "frame_plain_response.json",
        "frame_truncated_payload.json",
        "frame_varint_overrun.json",
        "frame_bad_utf8.json",
        "frame_wrong_wire_type.json",
    ];

    for f in files {
        let v = load(f);
        let raw = v.frame.decode();
        let res = decode_frame(&raw);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let frame = res.expect("expected ok frame");
        let ex = v.expect.expect("missing expect block");
        let d = &v.description;

        assert_eq!(frame.seq_id, ex["seq_id"].as_u64().unwrap(), "vector={d}");
        assert_eq!(frame.log_id, ex["log_id"].as_u64().unwrap(), "vector={d}");
        if let Some(service) = ex.get("service") {
            assert_eq!(u64::from(frame.service), service.as_u64().unwrap(), "vector={d}");
        }
        if let Some(method) = ex.get("method") {
            assert_eq!(u64::from(frame.method), method.as_u64().unwrap(), "vector={d}");
        }
        assert_eq!(frame.payload_type.as_str(), ex["payload_type"].as_str().unwrap(), "vector={d}");
        assert_eq!(frame.payload.len() as u64, ex["payload_len"].as_u64().unwrap(), "vector={d}");

        let headers = ex["headers"].as_object().unwrap();
        assert_eq!(frame.headers.len(), headers.len(), "vector={d}");
        for (k, val) in headers {
            assert_eq!(frame.headers.get(k).map(String::as_str), val.as_str(), "vector={d}");
        }

        if let Some(rx) = ex.get("response") {
            let response = decode_response(&frame).unwrap();
            assert_eq!(response.cursor, rx["cursor"].as_str().unwrap(), "vector={d}");
            assert_eq!(response.internal_ext, rx["internal_ext"].as_str().unwrap(), "vector={d}");
            assert_eq!(response.need_ack, rx["need_ack"].as_bool().unwrap(), "vector={d}");
            assert_eq!(response.messages_list.len() as u64, rx["messages"].as_u64().unwrap(), "vector={d}");
        }

        // Re-encoding a decoded frame must decode to the same frame.
        let again = decode_frame(&encode_frame(&frame)).unwrap();
        assert_eq!(again, frame, "vector={d}");
    }
}
