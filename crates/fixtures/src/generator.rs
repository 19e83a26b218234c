use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;

use payline_core::{AggregateId, MinorUnits};
use payline_recipients::{
    ComplianceProfile, ContactInfo, OfacStatus, PhoneNumber, RecipientId, RecipientStatus,
    RegisterRecipient, VerificationState,
};

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Michael", "Sarah", "David", "Emma", "Chris", "Lisa", "Alex", "Maria",
    "James", "Anna", "Robert", "Emily", "Daniel", "Jessica", "Matthew", "Ashley", "Andrew",
    "Amanda",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Anderson", "Taylor", "Thomas", "Hernandez", "Moore", "Martin",
    "Jackson", "Thompson", "White",
];

const DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "company.com",
    "business.org",
];

const METHODS: &[&str] = &["ach", "paypal", "venmo", "cash_app", "intl_bank"];

const STATUSES: &[RecipientStatus] = &[
    RecipientStatus::Verified,
    RecipientStatus::Unverified,
    RecipientStatus::InReview,
    RecipientStatus::Disabled,
];

/// A generated recipient: registration command plus post-registration state
/// the seeder should apply (funding credit, compliance outcome, status).
///
/// Everything here satisfies the domain invariants, so seeding is just a
/// matter of dispatching the commands in order.
#[derive(Debug, Clone)]
pub struct DemoRecipient {
    pub register: RegisterRecipient,
    pub status: RecipientStatus,
    pub compliance: ComplianceProfile,
    /// Initial wallet funding; zero means "leave the wallet empty".
    pub funding: MinorUnits,
}

/// Generate one demo recipient.
pub fn demo_recipient(rng: &mut impl Rng) -> DemoRecipient {
    let first = *FIRST_NAMES.choose(rng).unwrap_or(&"John");
    let last = *LAST_NAMES.choose(rng).unwrap_or(&"Smith");
    let domain = *DOMAINS.choose(rng).unwrap_or(&"example.com");
    let email = format!(
        "{}.{}@{}",
        first.to_lowercase(),
        last.to_lowercase(),
        domain
    );

    let register = RegisterRecipient {
        recipient_id: RecipientId::new(AggregateId::new()),
        first_name: first.to_string(),
        last_name: last.to_string(),
        contact: ContactInfo {
            email,
            phone: Some(PhoneNumber {
                country_code: "1".to_string(),
                number: format!("415{:07}", rng.gen_range(1_000_000..10_000_000)),
            }),
        },
        default_method: (*METHODS.choose(rng).unwrap_or(&"ach")).to_string(),
        occurred_at: Utc::now(),
    };

    DemoRecipient {
        register,
        status: *STATUSES.choose(rng).unwrap_or(&RecipientStatus::Unverified),
        compliance: demo_compliance(rng),
        funding: MinorUnits::new(rng.gen_range(0..1_000_000)),
    }
}

/// Generate a batch of demo recipients.
pub fn demo_recipients(rng: &mut impl Rng, count: usize) -> Vec<DemoRecipient> {
    (0..count).map(|_| demo_recipient(rng)).collect()
}

fn demo_compliance(rng: &mut impl Rng) -> ComplianceProfile {
    let flagged = rng.gen_bool(0.1);
    ComplianceProfile {
        tax_id_collected: rng.gen_bool(0.7),
        tax_id_verification: *[
            VerificationState::Verified,
            VerificationState::Pending,
            VerificationState::Unsubmitted,
        ]
        .choose(rng)
        .unwrap_or(&VerificationState::Unsubmitted),
        address_collected: rng.gen_bool(0.8),
        date_of_birth_collected: rng.gen_bool(0.8),
        id_verified: rng.gen_bool(0.6),
        flagged,
        ofac_status: if flagged {
            OfacStatus::Flagged
        } else {
            OfacStatus::Unflagged
        },
    }
}
