//! Data API (`rest/v1`) adapter.
//!
//! Tables are addressed with column filters in the query string
//! (`column=eq.value`, `order=column.asc`). Writes ask for the stored row
//! back with `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use haven_core::{AppRole, Booking, BookingId, BookingRequest, BookingStatus, Room, RoomFilter, RoomId, UserId};

use super::{BookingStore, PlatformClient, PlatformError, Profile, ProfileStore, RolePolicy, RoomSource};

const BOOKING_SELECT: &str = "*,rooms(name,type,price)";

/// Row written when a booking is created.
#[derive(Debug, Serialize)]
struct NewBookingRow<'a> {
    user_id: UserId,
    room_id: RoomId,
    check_in: chrono::NaiveDate,
    check_out: chrono::NaiveDate,
    guests: u8,
    total_price: rust_decimal::Decimal,
    status: BookingStatus,
    special_requests: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OwnerRow {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: AppRole,
}

impl PlatformClient {
    /// URL for `table` with `select` and the given `column=op.value` filters.
    pub(crate) fn table_url(
        &self,
        table: &str,
        select: &str,
        filters: &[(&str, String)],
    ) -> Result<Url, PlatformError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", select);
            for (column, value) in filters {
                pairs.append_pair(column, value);
            }
        }
        Ok(url)
    }
}

fn room_filters(filter: RoomFilter) -> Vec<(&'static str, String)> {
    let mut filters = Vec::new();
    if filter.available_only {
        filters.push(("available", "eq.true".to_string()));
    }
    if let Some(category) = filter.category {
        filters.push(("type", format!("eq.{category}")));
    }
    filters.push(("order", "price.asc".to_string()));
    filters
}

#[async_trait]
impl RoomSource for PlatformClient {
    #[instrument(skip(self))]
    async fn list_rooms(&self, filter: RoomFilter) -> Result<Vec<Room>, PlatformError> {
        let url = self.table_url("rooms", "*", &room_filters(filter))?;
        self.send(self.request(Method::GET, url, None)).await
    }

    #[instrument(skip(self))]
    async fn room(&self, id: RoomId) -> Result<Option<Room>, PlatformError> {
        let url = self.table_url("rooms", "*", &[("id", format!("eq.{id}"))])?;
        let rooms: Vec<Room> = self.send(self.request(Method::GET, url, None)).await?;
        Ok(rooms.into_iter().next())
    }
}

#[async_trait]
impl BookingStore for PlatformClient {
    #[instrument(skip(self, access_token))]
    async fn list_for_user(
        &self,
        access_token: &str,
        user_id: UserId,
    ) -> Result<Vec<Booking>, PlatformError> {
        let url = self.table_url(
            "bookings",
            BOOKING_SELECT,
            &[
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        self.send(self.request(Method::GET, url, Some(access_token)))
            .await
    }

    #[instrument(skip(self, access_token, request), fields(room_id = %request.room_id))]
    async fn insert(
        &self,
        access_token: &str,
        user_id: UserId,
        request: &BookingRequest,
    ) -> Result<Booking, PlatformError> {
        let url = self.table_url("bookings", BOOKING_SELECT, &[])?;
        let row = NewBookingRow {
            user_id,
            room_id: request.room_id,
            check_in: request.stay.check_in(),
            check_out: request.stay.check_out(),
            guests: request.guests.get(),
            total_price: request.total_price.rounded(),
            status: BookingStatus::Pending,
            special_requests: request.special_requests.as_deref(),
        };

        let rows: Vec<Booking> = self
            .send(
                self.request(Method::POST, url, Some(access_token))
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound("inserted booking was not returned".to_string()))
    }

    #[instrument(skip(self, access_token))]
    async fn cancel(
        &self,
        access_token: &str,
        id: BookingId,
    ) -> Result<Option<UserId>, PlatformError> {
        let url = self.table_url("bookings", "user_id", &[("id", format!("eq.{id}"))])?;

        let rows: Vec<OwnerRow> = self
            .send(
                self.request(Method::PATCH, url, Some(access_token))
                    .header("Prefer", "return=representation")
                    .json(&serde_json::json!({ "status": BookingStatus::Cancelled })),
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.user_id))
    }

    #[instrument(skip_all)]
    async fn count_visible(&self, access_token: &str) -> Result<usize, PlatformError> {
        let url = self.table_url("bookings", "id", &[])?;
        let rows: Vec<serde::de::IgnoredAny> = self
            .send(self.request(Method::GET, url, Some(access_token)))
            .await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl RolePolicy for PlatformClient {
    #[instrument(skip(self, access_token))]
    async fn has_role(
        &self,
        access_token: &str,
        user_id: UserId,
        role: AppRole,
    ) -> Result<bool, PlatformError> {
        let url = self.table_url(
            "user_roles",
            "role",
            &[
                ("user_id", format!("eq.{user_id}")),
                ("role", format!("eq.{role}")),
                ("limit", "1".to_string()),
            ],
        )?;
        let rows: Vec<RoleRow> = self
            .send(self.request(Method::GET, url, Some(access_token)))
            .await?;
        Ok(rows.iter().any(|row| row.role == role))
    }
}

#[async_trait]
impl ProfileStore for PlatformClient {
    #[instrument(skip(self, access_token))]
    async fn profile(
        &self,
        access_token: &str,
        user_id: UserId,
    ) -> Result<Option<Profile>, PlatformError> {
        let url = self.table_url("profiles", "*", &[("user_id", format!("eq.{user_id}"))])?;
        let rows: Vec<Profile> = self
            .send(self.request(Method::GET, url, Some(access_token)))
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use haven_core::RoomCategory;

    use super::*;
    use crate::config::PlatformConfig;

    fn client() -> PlatformClient {
        PlatformClient::new(&PlatformConfig {
            url: Url::parse("https://abc.platform.test/").unwrap(),
            anon_key: "anon-key".to_owned(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_room_list_url() {
        let filter = RoomFilter {
            category: Some(RoomCategory::Executive),
            available_only: true,
        };
        let url = client()
            .table_url("rooms", "*", &room_filters(filter))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.platform.test/rest/v1/rooms?select=*&available=eq.true&type=eq.executive&order=price.asc"
        );
    }

    #[test]
    fn test_booking_list_url_joins_room() {
        let user_id: UserId = "1f3e5d7c-9b1a-4c2e-8d6f-0a2b4c6d8e0f".parse().unwrap();
        let url = client()
            .table_url(
                "bookings",
                BOOKING_SELECT,
                &[
                    ("user_id", format!("eq.{user_id}")),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            query,
            vec![
                ("select".to_owned(), "*,rooms(name,type,price)".to_owned()),
                ("user_id".to_owned(), format!("eq.{user_id}")),
                ("order".to_owned(), "created_at.desc".to_owned()),
            ]
        );
    }

    #[test]
    fn test_new_booking_row_shape() {
        let row = NewBookingRow {
            user_id: UserId::random(),
            room_id: RoomId::random(),
            check_in: chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            check_out: chrono::NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
            guests: 2,
            total_price: rust_decimal::Decimal::new(8_338_512, 2),
            status: BookingStatus::Pending,
            special_requests: None,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["check_in"], "2025-03-01");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["total_price"], "83385.12");
        assert!(value["special_requests"].is_null());
    }
}
