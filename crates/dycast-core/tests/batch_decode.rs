//! Response batches end to end: gzip frame -> Response -> normalized messages.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use dycast_core::id::SnowflakeId;
use dycast_core::normalize::normalize_batch;
use dycast_core::protocol::schema::{
    Common, ControlMessage, GiftMessage, GiftStruct, LikeMessage, Message, Response, User,
};
use dycast_core::protocol::{decode_frame, decode_response, encode_frame, DyMethod, Frame, SubMessage};

fn user(name: &str) -> Option<User> {
    Some(User {
        id: 7,
        nick_name: name.into(),
        ..User::default()
    })
}

#[test]
fn gift_in_gzip_frame_normalizes() {
    let gift = SubMessage::Gift(GiftMessage {
        common: Some(Common {
            msg_id: 7_400_000_000_000_000_001,
            describe: "alice sent Rose x5".into(),
            ..Common::default()
        }),
        gift_id: 123,
        repeat_count: 5,
        user: user("alice"),
        gift: Some(GiftStruct {
            name: "Rose".into(),
            diamond_count: 10,
            ..GiftStruct::default()
        }),
        ..GiftMessage::default()
    });
    let like = SubMessage::Like(LikeMessage {
        count: 3,
        total: 1_200,
        user: user("bob"),
        ..LikeMessage::default()
    });
    let response = Response {
        messages_list: vec![
            gift.to_message(),
            Message {
                method: "WebcastRanklistHourEntranceMessage".into(),
                ..Message::default()
            },
            like.to_message(),
        ],
        cursor: "C1".into(),
        internal_ext: "E1".into(),
        need_ack: true,
        ..Response::default()
    };

    let wire = encode_frame(&Frame::with_response(&response, true));
    let frame = decode_frame(&wire).unwrap();
    assert!(frame.is_gzip());
    let decoded = decode_response(&frame).unwrap();
    assert_eq!(decoded.cursor, "C1");
    assert_eq!(decoded.internal_ext, "E1");

    let ids = SnowflakeId::new(37).unwrap();
    let batch = normalize_batch(&decoded.messages_list, &ids);
    assert_eq!(batch.len(), 2);

    let g = &batch[0];
    assert_eq!(g.method, DyMethod::Gift);
    assert_eq!(g.id, "7400000000000000001");
    let gift = g.gift.as_ref().unwrap();
    assert_eq!((gift.id.as_str(), gift.count, gift.price), ("123", 5, 10));
    assert_eq!(g.content, "alice sent Rose x5");

    let l = &batch[1];
    assert_eq!(l.method, DyMethod::Like);
    assert_eq!(l.room.as_ref().unwrap().like_count, Some(1_200));
    assert!(!l.id.is_empty());
}

#[test]
fn live_end_control_is_flagged() {
    let response = Response {
        messages_list: vec![SubMessage::Control(ControlMessage {
            common: None,
            status: 3,
        })
        .to_message()],
        ..Response::default()
    };
    let frame = decode_frame(&encode_frame(&Frame::with_response(&response, false))).unwrap();
    let ids = SnowflakeId::new(0).unwrap();
    let batch = normalize_batch(&decode_response(&frame).unwrap().messages_list, &ids);
    assert_eq!(batch.len(), 1);
    assert!(batch[0].is_live_end());
}
