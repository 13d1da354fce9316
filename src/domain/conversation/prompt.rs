//! Prompt construction for reply generation and lead extraction.
//!
//! The reply prompt is rebuilt on every call from the live catalogue so the
//! assistant never answers from a stale or invented list. Internal ids are
//! never shown to the model.

use std::fmt::Write as _;

use super::{LeadProfile, Message, SenderType};
use crate::domain::listing::Listing;

/// Business-facing voice of the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub business_name: String,
    pub assistant_name: String,
    pub currency_symbol: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            business_name: "our property team".to_string(),
            assistant_name: "Assistant".to_string(),
            currency_symbol: "₦".to_string(),
        }
    }
}

/// What the grounding provider could tell us about the catalogue.
#[derive(Debug, Clone, Copy)]
pub enum Catalogue<'a> {
    Listings(&'a [Listing]),
    /// The listing query failed; the assistant must not guess.
    Unavailable,
}

const CATALOGUE_HEADER: &str = "## Available properties";

/// Builds the system prompt for a reply.
pub fn build_reply_prompt(settings: &PromptSettings, catalogue: Catalogue<'_>) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are {}, the virtual assistant for {}. You chat with prospective tenants \
         and buyers about available properties.",
        settings.assistant_name, settings.business_name
    );
    prompt.push_str(
        "Be warm and concise. Only describe properties listed below. Never invent \
         prices, locations, or availability. If a prospect asks for something that \
         is not listed, say so and offer to connect them with an agent. Ask for their \
         name, budget, preferred location, and when they would like to view if they \
         have not said.\n\n",
    );

    prompt.push_str(CATALOGUE_HEADER);
    prompt.push('\n');

    match catalogue {
        Catalogue::Listings(listings) if listings.is_empty() => {
            prompt.push_str(
                "There are currently NO properties available. Tell the prospect nothing \
                 is available right now and offer to take their details so an agent can \
                 follow up.\n",
            );
        }
        Catalogue::Listings(listings) => {
            for listing in listings {
                prompt.push_str(&describe_listing(listing, &settings.currency_symbol));
                prompt.push('\n');
            }
        }
        Catalogue::Unavailable => {
            prompt.push_str(
                "The property catalogue is temporarily unavailable. Do not quote any \
                 property, price, or availability. Offer to have an agent follow up.\n",
            );
        }
    }

    prompt
}

/// One catalogue line: name, location, rooms, price, description.
pub fn describe_listing(listing: &Listing, currency_symbol: &str) -> String {
    let mut line = format!("- {} ({})", listing.name, listing.location);

    match (listing.bedrooms, listing.bathrooms) {
        (Some(bed), Some(bath)) => {
            let _ = write!(line, ", {} bed / {} bath", bed, bath);
        }
        (Some(bed), None) => {
            let _ = write!(line, ", {} bed", bed);
        }
        (None, Some(bath)) => {
            let _ = write!(line, ", {} bath", bath);
        }
        (None, None) => {}
    }

    match listing.price {
        Some(price) => {
            let _ = write!(line, ", {}", format_price(price, currency_symbol));
        }
        None => line.push_str(", price on request"),
    }

    if let Some(description) = listing.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            let _ = write!(line, ". {}", description);
        }
    }

    line
}

/// Formats an amount with thousands separators, e.g. `₦2,500,000`.
///
/// Whole amounts drop the decimals.
pub fn format_price(amount: f64, currency_symbol: &str) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let fraction = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if fraction == 0 {
        format!("{}{}{}", sign, currency_symbol, grouped)
    } else {
        format!("{}{}{}.{:02}", sign, currency_symbol, grouped, fraction)
    }
}

/// System prompt for the extraction pass. Asks for a fixed JSON shape.
pub const EXTRACTION_INSTRUCTIONS: &str = r#"You extract structured lead data from a property enquiry chat.
Reply with ONE JSON object and nothing else, using exactly these keys:
{
  "name": string or null,
  "intent": "rent" | "buy" | "viewing" | "inquiry" | "other" | null,
  "preferences": {
    "budget_min": number or null,
    "budget_max": number or null,
    "preferred_locations": [string] or null,
    "bedrooms": integer or null,
    "move_in_date": string or null,
    "property_type": string or null,
    "other_notes": string or null
  },
  "interested_properties": [property name] or null,
  "schedule": {
    "requested_dates": [string] or null,
    "confirmed_date": string or null,
    "notes": string or null
  },
  "summary": string or null
}
Use null for anything the conversation does not state. Do not repeat known facts unless they changed."#;

/// User message for the extraction pass: known facts plus the transcript.
pub fn build_extraction_input(known: &LeadProfile, transcript: &[Message]) -> String {
    let known_json = serde_json::to_string_pretty(known).unwrap_or_else(|_| "{}".to_string());

    let mut input = String::new();
    let _ = writeln!(input, "Known facts so far:\n{}\n", known_json);
    input.push_str("Transcript:\n");
    for message in transcript {
        let speaker = match message.sender_type {
            SenderType::Prospect => "Prospect",
            SenderType::Ai => "Assistant",
            SenderType::Agent => "Agent",
        };
        let _ = writeln!(input, "{}: {}", speaker, message.content);
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ConversationId;

    fn lekki_two_bed() -> Listing {
        Listing::new("Palm Court Apartments", "Lekki Phase 1")
            .with_rooms(2, 2)
            .with_price(2_500_000.0)
            .with_description("Serviced 2 bedroom flat with 24h power")
    }

    #[test]
    fn reply_prompt_lists_name_location_rooms_and_price() {
        let listings = vec![lekki_two_bed()];
        let prompt = build_reply_prompt(&PromptSettings::default(), Catalogue::Listings(&listings));

        assert!(prompt.contains("Palm Court Apartments"));
        assert!(prompt.contains("Lekki Phase 1"));
        assert!(prompt.contains("2 bed / 2 bath"));
        assert!(prompt.contains("₦2,500,000"));
        assert!(prompt.contains("24h power"));
    }

    #[test]
    fn reply_prompt_hides_listing_ids() {
        let listings = vec![lekki_two_bed()];
        let id = listings[0].id.to_string();
        let prompt = build_reply_prompt(&PromptSettings::default(), Catalogue::Listings(&listings));
        assert!(!prompt.contains(&id));
    }

    #[test]
    fn empty_catalogue_is_stated_explicitly() {
        let prompt = build_reply_prompt(&PromptSettings::default(), Catalogue::Listings(&[]));
        assert!(prompt.contains(CATALOGUE_HEADER));
        assert!(prompt.contains("NO properties available"));
    }

    #[test]
    fn unavailable_catalogue_forbids_quoting() {
        let prompt = build_reply_prompt(&PromptSettings::default(), Catalogue::Unavailable);
        assert!(prompt.contains("temporarily unavailable"));
    }

    #[test]
    fn settings_flow_into_the_persona() {
        let settings = PromptSettings {
            business_name: "Harbour Homes".into(),
            assistant_name: "Ife".into(),
            currency_symbol: "$".into(),
        };
        let prompt = build_reply_prompt(&settings, Catalogue::Listings(&[]));
        assert!(prompt.contains("You are Ife, the virtual assistant for Harbour Homes"));
    }

    #[test]
    fn format_price_groups_thousands() {
        assert_eq!(format_price(0.0, "$"), "$0");
        assert_eq!(format_price(950.0, "$"), "$950");
        assert_eq!(format_price(1_000.0, "$"), "$1,000");
        assert_eq!(format_price(2_500_000.0, "₦"), "₦2,500,000");
        assert_eq!(format_price(1234.5, "£"), "£1,234.50");
    }

    #[test]
    fn listing_without_price_says_on_request() {
        let listing = Listing::new("Quiet Annex", "Yaba");
        assert_eq!(describe_listing(&listing, "₦"), "- Quiet Annex (Yaba), price on request");
    }

    #[test]
    fn extraction_input_labels_speakers() {
        let id = ConversationId::new();
        let transcript = vec![
            Message::from_prospect(id, "I'm Ada, looking in Lekki"),
            Message::from_ai(id, "Welcome Ada!"),
        ];
        let input = build_extraction_input(&LeadProfile::default(), &transcript);
        assert!(input.contains("Prospect: I'm Ada, looking in Lekki"));
        assert!(input.contains("Assistant: Welcome Ada!"));
        assert!(input.contains("Known facts so far"));
    }
}
