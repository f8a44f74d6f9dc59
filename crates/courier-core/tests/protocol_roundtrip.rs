//! Property tests for the reserved protocol over the default codec.

use courier_core::protocol::{RoomCreateRequest, RoomJoin, RoomRequest, UserJoin};
use courier_core::{Envelope, Event, JsonCodec};
use proptest::prelude::*;

proptest! {
    #[test]
    fn room_join_survives_the_wire(id in ".{0,32}", room in "[a-z0-9_-]{1,16}", channel in "[a-z]{1,12}") {
        let event = RoomJoin { id: id.clone(), room: room.clone() };
        let bytes = Envelope::from_event(channel.clone(), &event).unwrap().encode(&JsonCodec).unwrap();
        let envelope = Envelope::decode(&JsonCodec, &bytes).unwrap();

        prop_assert_eq!(&envelope.channel, &channel);
        prop_assert_eq!(envelope.name.as_str(), RoomJoin::ALIAS);
        prop_assert_eq!(envelope.into_event::<RoomJoin>().unwrap(), event);
    }

    #[test]
    fn room_requests_keep_their_target(room in "[a-z0-9]{1,16}", public in any::<bool>()) {
        let envelope = Envelope::from_event("lobby", &RoomCreateRequest { room: room.clone(), public }).unwrap();
        let request = RoomRequest::decode(envelope).unwrap();
        prop_assert_eq!(request.room(), room.as_str());
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = Envelope::decode(&JsonCodec, &bytes);
    }
}

#[test]
fn user_join_is_not_a_room_request() {
    let envelope = Envelope::from_event("lobby", &UserJoin { id: "1".into() }).unwrap();
    assert!(!RoomRequest::is_room_event(&envelope.name));
    assert!(RoomRequest::decode(envelope).is_err());
}
