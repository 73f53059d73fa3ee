//! Canonical result → HubSpot contact property patch.
//!
//! Fields whose value could not be determined are left out of the patch so an
//! update never clears data stored by an earlier verification. `false`, `0`
//! and `""` are determinate and are always sent.

use crate::coercion::bool_to_property;
use crate::models::{properties, PropertyPatch, VerificationResult};

pub fn to_property_patch(result: &VerificationResult) -> PropertyPatch {
    let mut patch = PropertyPatch::new();

    patch.insert(properties::RESULT, result.result.as_str());
    patch.insert_opt(properties::REASON, result.reason.clone());
    patch.insert(properties::DISPOSABLE, bool_to_property(result.disposable));
    patch.insert(properties::ACCEPT_ALL, bool_to_property(result.accept_all));
    patch.insert(properties::ROLE, bool_to_property(result.role));
    patch.insert(properties::FREE, bool_to_property(result.free));
    patch.insert(properties::SUCCESS, bool_to_property(result.success));
    patch.insert_opt(properties::SENDEX, result.sendex.map(|s| s.to_string()));
    patch.insert_opt(properties::DID_YOU_MEAN, result.did_you_mean.clone());
    patch.insert_opt(properties::EMAIL_NORMALIZED, result.email_normalized.clone());
    patch.insert(properties::VERIFICATION_DATE, result.verification_date());

    patch
}
