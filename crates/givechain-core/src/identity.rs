use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const LOOKUP_DELAY_MS: u64 = 1_000;

/// Details reported by the identity service for a registered address.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    pub id: String,
    pub name: String,
    pub verified: bool,
    pub level: u8,
}

/// Stand-in for the external identity collaborator.
///
/// The service itself is out of scope; this mock reproduces its call
/// shapes with the same injectable delay/RNG discipline as the network
/// simulator. Registration follows a fixed demo rule so that some
/// addresses verifiably have an identity and some don't.
pub struct IdentityService {
    rng: StdRng,
    delay: Duration,
}

impl IdentityService {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            delay: Duration::from_millis(LOOKUP_DELAY_MS),
        }
    }

    pub fn without_delay(mut self) -> Self {
        self.delay = Duration::ZERO;
        self
    }

    /// Whether the address carries a registered identity.
    ///
    /// Demo rule: lowercase addresses ending in `a`, `e`, or `0` are
    /// registered.
    pub fn has_identity(&self, address: &str) -> bool {
        self.pause();
        Self::registered(address)
    }

    /// Run the verification flow. Always succeeds in this mock.
    pub fn verify(&self, _address: &str) -> bool {
        self.pause();
        true
    }

    /// Identity details, or `None` when the address is not registered.
    pub fn details(&mut self, address: &str) -> Option<IdentityProfile> {
        self.pause();
        if !Self::registered(address) {
            return None;
        }
        let stripped = address.strip_prefix("0x").unwrap_or(address);
        Some(IdentityProfile {
            id: format!("ocid_{}", stripped.get(..8).unwrap_or(stripped)),
            name: format!("User_{}", stripped.get(..4).unwrap_or(stripped)),
            verified: true,
            level: self.rng.gen_range(1..=3),
        })
    }

    fn registered(address: &str) -> bool {
        let lower = address.to_ascii_lowercase();
        lower.ends_with('a') || lower.ends_with('e') || lower.ends_with('0')
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

impl Default for IdentityService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_follows_the_demo_rule() {
        let service = IdentityService::seeded(1).without_delay();
        assert!(service.has_identity("0x91b7a3c1d40f3a7e0b24a1f09a6ed0c39cc0f8ae"));
        assert!(service.has_identity("0x91B7A3C1D40F3A7E0B24A1F09A6ED0C39CC0F8AE"));
        assert!(service.has_identity("0x4f2accb6c94f2e1f1c22296ed60b0e9dacbca8f0"));
        assert!(!service.has_identity("0x4f2accb6c94f2e1f1c22296ed60b0e9dacbca8f3"));
    }

    #[test]
    fn verification_always_succeeds() {
        let service = IdentityService::seeded(1).without_delay();
        assert!(service.verify("0xanything"));
    }

    #[test]
    fn details_are_derived_from_the_address() {
        let mut service = IdentityService::seeded(1).without_delay();
        let profile = service
            .details("0x91b7a3c1d40f3a7e0b24a1f09a6ed0c39cc0f8ae")
            .unwrap();
        assert_eq!(profile.id, "ocid_91b7a3c1");
        assert_eq!(profile.name, "User_91b7");
        assert!(profile.verified);
        assert!((1..=3).contains(&profile.level));

        assert!(service
            .details("0x4f2accb6c94f2e1f1c22296ed60b0e9dacbca8f3")
            .is_none());
    }
}
