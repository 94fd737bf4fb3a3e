//! Room bookings and event seats.
//!
//! Both insert the booking before the contract call so the slot is held
//! while the transaction is mined; a failed call releases it.

use chrono::{Duration, Utc};

use super::{Portal, PortalError, PortalResult};
use crate::blockchain::ChainReceipt;
use crate::domain::{
    Booking, Event, EventJoinRequest, LedgerEntry, NewBooking, Room, RoomBookingRequest, TxKind,
};

impl Portal {
    pub(crate) async fn require_room(&self, room_id: i32) -> PortalResult<Room> {
        self.store
            .find_room(room_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Room {} not found", room_id)))
    }

    pub(crate) async fn require_event(&self, event_id: i32) -> PortalResult<Event> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Event {} not found", event_id)))
    }

    pub async fn book_room(
        &self,
        room_id: i32,
        request: RoomBookingRequest,
    ) -> PortalResult<Booking> {
        let room = self.require_room(room_id).await?;
        let user = self.require_user(request.user_id).await?;

        if request.ends_at <= request.starts_at {
            return Err(PortalError::Invalid(
                "Booking must end after it starts".to_string(),
            ));
        }
        if request.starts_at <= Utc::now() {
            return Err(PortalError::Invalid(
                "Booking must start in the future".to_string(),
            ));
        }
        let max_hours = self.config.amenities.max_booking_hours;
        if request.ends_at - request.starts_at > Duration::hours(i64::from(max_hours)) {
            return Err(PortalError::Invalid(format!(
                "Bookings are limited to {} hours",
                max_hours
            )));
        }
        let overlapping = self
            .store
            .count_overlapping_bookings(room.room_id, request.starts_at, request.ends_at)
            .await?;
        if overlapping > 0 {
            return Err(PortalError::Conflict(format!(
                "Room {} is already booked for that time",
                room.room_id
            )));
        }
        self.require_identity(&user)?;
        let wallet = match &self.ledger {
            Some(_) => Some(self.recipient(&user, request.wallet_address.as_deref())?),
            None => None,
        };

        let booking = self
            .store
            .insert_booking(&NewBooking {
                user_id: user.user_id,
                room_id: Some(room.room_id),
                event_id: None,
                starts_at: request.starts_at,
                ends_at: request.ends_at,
            })
            .await?;
        let token_uri = self.booking_uri(booking.booking_id);

        let receipt = match (&self.ledger, wallet) {
            (Some(ledger), Some(wallet)) => {
                match ledger
                    .book_room(wallet, room.room_id as u64, &token_uri)
                    .await
                {
                    Ok(receipt) => Some(receipt),
                    Err(e) => {
                        self.release_booking(&booking).await;
                        return Err(e.into());
                    }
                }
            }
            _ => None,
        };

        let booking = self
            .record_booking(booking, &token_uri, receipt, TxKind::RoomBooking)
            .await?;
        tracing::info!(
            booking_id = booking.booking_id,
            room_id = room.room_id,
            user_id = user.user_id,
            "Room booked"
        );
        Ok(booking)
    }

    pub async fn join_event(
        &self,
        event_id: i32,
        request: EventJoinRequest,
    ) -> PortalResult<Booking> {
        let event = self.require_event(event_id).await?;
        let user = self.require_user(request.user_id).await?;

        if event.starts_at <= Utc::now() {
            return Err(PortalError::Invalid(format!(
                "Event {} has already started",
                event.event_id
            )));
        }
        if self
            .store
            .find_event_booking(user.user_id, event.event_id)
            .await?
            .is_some()
        {
            return Err(PortalError::Conflict(format!(
                "User {} already joined event {}",
                user.user_id, event.event_id
            )));
        }
        let participants = self.store.count_event_bookings(event.event_id).await?;
        if participants >= i64::from(event.capacity) {
            return Err(PortalError::Conflict(format!(
                "Event {} is full",
                event.event_id
            )));
        }
        self.require_identity(&user)?;
        let wallet = match &self.ledger {
            Some(_) => Some(self.recipient(&user, request.wallet_address.as_deref())?),
            None => None,
        };

        let booking = self
            .store
            .insert_booking(&NewBooking {
                user_id: user.user_id,
                room_id: None,
                event_id: Some(event.event_id),
                starts_at: event.starts_at,
                ends_at: event.ends_at,
            })
            .await?;
        let token_uri = self.booking_uri(booking.booking_id);

        let receipt = match (&self.ledger, wallet) {
            (Some(ledger), Some(wallet)) => {
                match ledger
                    .join_event(wallet, event.event_id as u64, &token_uri)
                    .await
                {
                    Ok(receipt) => Some(receipt),
                    Err(e) => {
                        self.release_booking(&booking).await;
                        return Err(e.into());
                    }
                }
            }
            _ => None,
        };

        let booking = self
            .record_booking(booking, &token_uri, receipt, TxKind::EventJoin)
            .await?;
        tracing::info!(
            booking_id = booking.booking_id,
            event_id = event.event_id,
            user_id = user.user_id,
            "Event joined"
        );
        Ok(booking)
    }

    async fn release_booking(&self, booking: &Booking) {
        if let Err(e) = self.store.delete_booking(booking.booking_id).await {
            tracing::error!(
                booking_id = booking.booking_id,
                error = %e,
                "Failed to release booking after contract call failure"
            );
        }
    }

    async fn record_booking(
        &self,
        booking: Booking,
        token_uri: &str,
        receipt: Option<ChainReceipt>,
        kind: TxKind,
    ) -> PortalResult<Booking> {
        let entry = receipt.map(|r| LedgerEntry {
            user_id: booking.user_id,
            kind,
            amount: None,
            tx_hash: r.tx_hash,
        });
        match self
            .store
            .set_booking_receipt(booking.booking_id, token_uri, entry.as_ref())
            .await
        {
            Ok(booking) => Ok(booking),
            Err(e) => Err(match &entry {
                Some(entry) => self.diverged(kind.as_str(), &entry.tx_hash, e),
                None => e.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use crate::db::{MemoryStore, PortalStore};
    use crate::domain::{NewEvent, NewRoom};

    async fn seed_room(store: &MemoryStore) -> Room {
        store
            .insert_room(&NewRoom {
                name: "Seminar 2".to_string(),
                location: Some("Library".to_string()),
                capacity: 12,
            })
            .await
            .unwrap()
    }

    async fn seed_event(store: &MemoryStore, starts_in: Duration, capacity: i32) -> Event {
        let starts_at = Utc::now() + starts_in;
        store
            .insert_event(&NewEvent {
                title: "Rust meetup".to_string(),
                description: None,
                room_id: None,
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                capacity,
            })
            .await
            .unwrap()
    }

    fn slot(hours_from_now: i64, length_hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let starts_at = Utc::now() + Duration::hours(hours_from_now);
        (starts_at, starts_at + Duration::hours(length_hours))
    }

    fn booking(user_id: i32, (starts_at, ends_at): (DateTime<Utc>, DateTime<Utc>)) -> RoomBookingRequest {
        RoomBookingRequest {
            user_id,
            starts_at,
            ends_at,
            wallet_address: None,
        }
    }

    #[tokio::test]
    async fn test_book_room_records_receipt() {
        let ledger = Arc::new(ScriptedLedger::new());
        let (portal, store) = portal_with_ledger(ledger.clone());
        let user = seed_identified_user(&store, Some(WALLET_A)).await;
        let room = seed_room(&store).await;

        let booked = portal
            .book_room(room.room_id, booking(user.user_id, slot(24, 2)))
            .await
            .unwrap();

        assert!(booked.tx_hash.is_some());
        assert_eq!(
            booked.token_uri.as_deref(),
            Some(portal.booking_uri(booked.booking_id).as_str())
        );
        assert_eq!(ledger.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_booking_is_conflict() {
        let (portal, store) = portal_without_chain();
        let user = seed_user(&store, None).await;
        let room = seed_room(&store).await;
        let first = slot(48, 2);

        portal
            .book_room(room.room_id, booking(user.user_id, first))
            .await
            .unwrap();

        let overlapping = (first.0 + Duration::hours(1), first.1 + Duration::hours(1));
        let err = portal
            .book_room(room.room_id, booking(user.user_id, overlapping))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));

        // Back-to-back slots do not overlap.
        portal
            .book_room(room.room_id, booking(user.user_id, (first.1, first.1 + Duration::hours(1))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_booking_window_rules() {
        let (portal, store) = portal_without_chain();
        let user = seed_user(&store, None).await;
        let room = seed_room(&store).await;

        let (starts_at, _) = slot(10, 1);
        for window in [(starts_at, starts_at), slot(-2, 1), slot(10, 5)] {
            let err = portal
                .book_room(room.room_id, booking(user.user_id, window))
                .await
                .unwrap_err();
            assert!(matches!(err, PortalError::Invalid(_)));
        }
    }

    #[tokio::test]
    async fn test_failed_booking_call_releases_slot() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.fail("book_room");
        let (portal, store) = portal_with_ledger(ledger);
        let user = seed_identified_user(&store, Some(WALLET_A)).await;
        let room = seed_room(&store).await;

        let err = portal
            .book_room(room.room_id, booking(user.user_id, slot(24, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Chain(_)));
        assert!(store.list_room_bookings(room.room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_event_capacity_and_duplicates() {
        let (portal, store) = portal_without_chain();
        let event = seed_event(&store, Duration::days(2), 1).await;
        let first = seed_user(&store, None).await;
        let second = seed_user(&store, None).await;
        let join = |user_id| EventJoinRequest {
            user_id,
            wallet_address: None,
        };

        portal.join_event(event.event_id, join(first.user_id)).await.unwrap();

        let again = portal
            .join_event(event.event_id, join(first.user_id))
            .await
            .unwrap_err();
        assert!(matches!(again, PortalError::Conflict(_)));

        let full = portal
            .join_event(event.event_id, join(second.user_id))
            .await
            .unwrap_err();
        assert!(matches!(full, PortalError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_join_started_event_rejected() {
        let (portal, store) = portal_without_chain();
        let event = seed_event(&store, -Duration::hours(1), 10).await;
        let user = seed_user(&store, None).await;

        let err = portal
            .join_event(
                event.event_id,
                EventJoinRequest {
                    user_id: user.user_id,
                    wallet_address: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_join_event_needs_wallet_with_chain() {
        let ledger = Arc::new(ScriptedLedger::new());
        let (portal, store) = portal_with_ledger(ledger.clone());
        let event = seed_event(&store, Duration::days(1), 10).await;
        let user = seed_identified_user(&store, None).await;

        let err = portal
            .join_event(
                event.event_id,
                EventJoinRequest {
                    user_id: user.user_id,
                    wallet_address: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Invalid(_)));
        assert!(ledger.calls().is_empty());
        assert_eq!(store.count_event_bookings(event.event_id).await.unwrap(), 0);
    }
}
