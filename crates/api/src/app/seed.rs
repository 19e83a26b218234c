//! Demo-data seeding (dev runs only).
//!
//! The engine never generates demo data itself; this module drives the
//! fixtures generator through the normal service surface, so seeded state
//! obeys every domain invariant.

use anyhow::{Context, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;

use payline_fixtures::demo_recipients;
use payline_infra::PayoutEngine;
use payline_infra::engine::CreateRecipientRequest;

pub fn seed_demo(engine: &PayoutEngine, count: usize, rng_seed: u64) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(rng_seed);

    for demo in demo_recipients(&mut rng, count) {
        let rm = engine
            .create_recipient(CreateRecipientRequest {
                recipient_id: Some(demo.register.recipient_id),
                first_name: demo.register.first_name.clone(),
                last_name: demo.register.last_name.clone(),
                contact: demo.register.contact.clone(),
                default_method: demo.register.default_method.clone(),
            })
            .map_err(|e| anyhow!("{e:?}"))
            .context("registering demo recipient")?;

        if demo.funding.is_positive() {
            engine
                .fund_wallet(rm.recipient_id, demo.funding)
                .map_err(|e| anyhow!("{e:?}"))
                .context("funding demo wallet")?;
        }

        engine
            .set_recipient_status(rm.recipient_id, demo.status)
            .map_err(|e| anyhow!("{e:?}"))
            .context("setting demo recipient status")?;
        engine
            .update_compliance(rm.recipient_id, demo.compliance)
            .map_err(|e| anyhow!("{e:?}"))
            .context("setting demo compliance profile")?;
    }

    Ok(())
}
