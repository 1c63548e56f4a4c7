//! Checkout confirmation for a single pet listing. Read-only: confirming
//! only notifies and redirects.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use petora_types::models::{Listing, ListingType};

use crate::error::ClientError;
use crate::http::PetoraApi;
use crate::notice::Notice;
use crate::session::Viewer;

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutPhase {
    Loading,
    Ready(Listing),
    NotFound,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seller {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug)]
pub struct CheckoutState {
    listing_id: Uuid,
    phase: CheckoutPhase,
    notices: Vec<Notice>,
}

impl CheckoutState {
    pub fn new(listing_id: Uuid) -> Self {
        Self { listing_id, phase: CheckoutPhase::Loading, notices: Vec::new() }
    }

    pub fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    pub fn listing(&self) -> Option<&Listing> {
        match &self.phase {
            CheckoutPhase::Ready(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn finish_load(&mut self, result: Result<Listing, ClientError>) {
        self.phase = match result {
            Ok(listing) => CheckoutPhase::Ready(listing),
            Err(ClientError::NotFound) => CheckoutPhase::NotFound,
            Err(e) => {
                warn!("Loading listing {} failed: {}", self.listing_id, e);
                self.notices
                    .push(Notice::error("Error").with_description("Could not load pet details."));
                CheckoutPhase::Failed
            }
        };
    }

    pub fn seller(&self) -> Option<Seller> {
        let listing = self.listing()?;
        let seller = match listing.owner_email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => Seller {
                display_name: listing
                    .owner_name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "Pet Owner".into()),
                email: email.to_string(),
            },
            None => Seller { display_name: "Anonymous".into(), email: "Not available".into() },
        };
        Some(seller)
    }

    /// A zero or missing price reads as an adoption fee.
    pub fn total_label(&self) -> Option<String> {
        let listing = self.listing()?;
        Some(match listing.price {
            Some(price) if price > 0 => format!("₹{}", price),
            _ => "Adoption Fee".to_string(),
        })
    }

    pub fn confirm_label(&self) -> Option<&'static str> {
        self.listing().map(|l| match l.listing_type {
            ListingType::Sale => "Confirm Purchase",
            ListingType::Adoption => "Confirm Adoption",
        })
    }

    pub fn payment_method(&self) -> Option<&'static str> {
        self.listing()
            .filter(|l| l.listing_type == ListingType::Sale)
            .map(|_| "Cash on Delivery")
    }

    /// Returns the path to redirect to.
    pub fn confirm(&mut self, viewer: Option<&Viewer>) -> Option<String> {
        viewer?;
        let listing = self.listing()?;
        let notice = Notice::info("Purchase Confirmed!").with_description(format!(
            "Your request for {} has been submitted. The seller will contact you shortly.",
            listing.name
        ));
        let redirect = format!("/pets/{}", listing.id);
        self.notices.push(notice);
        Some(redirect)
    }
}

pub struct CheckoutView<A> {
    api: Arc<A>,
    listing_id: Uuid,
    state: CheckoutState,
}

impl<A: PetoraApi> CheckoutView<A> {
    pub fn new(api: Arc<A>, listing_id: Uuid) -> Self {
        Self { api, listing_id, state: CheckoutState::new(listing_id) }
    }

    pub async fn load(&mut self) {
        let result = self.api.get_listing(self.listing_id).await;
        self.state.finish_load(result);
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CheckoutState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn listing(listing_type: ListingType, price: Option<u64>, email: Option<&str>) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            name: "Biscuit".into(),
            breed: "Beagle".into(),
            image_url: String::new(),
            price,
            listing_type,
            owner_name: None,
            owner_email: email.map(str::to_string),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn ready(l: Listing) -> CheckoutState {
        let mut state = CheckoutState::new(l.id);
        state.finish_load(Ok(l));
        state
    }

    #[test]
    fn sale_labels() {
        let state = ready(listing(ListingType::Sale, Some(4500), Some("seller@example.com")));
        assert_eq!(state.total_label().as_deref(), Some("₹4500"));
        assert_eq!(state.confirm_label(), Some("Confirm Purchase"));
        assert_eq!(state.payment_method(), Some("Cash on Delivery"));
        assert_eq!(
            state.seller(),
            Some(Seller { display_name: "Pet Owner".into(), email: "seller@example.com".into() })
        );
    }

    #[test]
    fn adoption_without_owner_email() {
        let state = ready(listing(ListingType::Adoption, None, None));
        assert_eq!(state.total_label().as_deref(), Some("Adoption Fee"));
        assert_eq!(state.confirm_label(), Some("Confirm Adoption"));
        assert_eq!(state.payment_method(), None);
        assert_eq!(
            state.seller(),
            Some(Seller { display_name: "Anonymous".into(), email: "Not available".into() })
        );
    }

    #[test]
    fn missing_listing_is_not_found_without_notice() {
        let mut state = CheckoutState::new(Uuid::new_v4());
        state.finish_load(Err(ClientError::NotFound));
        assert_eq!(state.phase(), &CheckoutPhase::NotFound);
        assert!(state.take_notices().is_empty());
        assert!(state.seller().is_none());
    }

    #[test]
    fn load_failure_raises_notice() {
        let mut state = CheckoutState::new(Uuid::new_v4());
        state.finish_load(Err(ClientError::Decode("bad json".into())));
        assert_eq!(state.phase(), &CheckoutPhase::Failed);
        let notices = state.take_notices();
        assert_eq!(notices[0].description.as_deref(), Some("Could not load pet details."));
    }

    #[test]
    fn confirm_needs_viewer_and_listing() {
        let l = listing(ListingType::Sale, Some(10), None);
        let id = l.id;
        let mut state = ready(l);
        assert!(state.confirm(None).is_none());

        let viewer = Viewer::new("u1", "Asha");
        assert_eq!(state.confirm(Some(&viewer)), Some(format!("/pets/{}", id)));
        let notice = &state.take_notices()[0];
        assert_eq!(notice.title, "Purchase Confirmed!");
        assert_eq!(
            notice.description.as_deref(),
            Some("Your request for Biscuit has been submitted. The seller will contact you shortly.")
        );

        let mut loading = CheckoutState::new(Uuid::new_v4());
        assert!(loading.confirm(Some(&viewer)).is_none());
    }
}
