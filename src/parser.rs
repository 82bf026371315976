//! Protobuf decoding of GTFS Realtime vehicle-position feeds.

use anyhow::{Context, Result};
use prost::Message;

use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    FeedMessage::decode(bytes)
        .with_context(|| format!("invalid GTFS-RT feed ({} bytes)", bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader, Position, VehiclePosition};

    fn header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1234567890),
            incrementality: None,
            feed_version: None,
        }
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let err = parse_feed(&invalid_bytes).unwrap_err();
        assert!(err.to_string().contains("4 bytes"));
    }

    #[test]
    fn test_parse_vehicle_feed() {
        let feed = FeedMessage {
            header: header(),
            entity: vec![FeedEntity {
                id: "v1".to_string(),
                vehicle: Some(VehiclePosition {
                    position: Some(Position {
                        latitude: 49.28,
                        longitude: -123.12,
                        bearing: Some(180.0),
                        speed: None,
                        odometer: None,
                    }),
                    timestamp: Some(1234567890),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        };

        let parsed = parse_feed(&feed.encode_to_vec()).unwrap();

        assert_eq!(parsed.header.gtfs_realtime_version, "2.0");
        assert_eq!(parsed.entity.len(), 1);
        let position = parsed.entity[0].vehicle.as_ref().unwrap().position.as_ref().unwrap();
        assert_eq!(position.latitude, 49.28);
        assert_eq!(position.bearing, Some(180.0));
    }
}
