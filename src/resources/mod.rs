//! Static emergency-resources directory. Read-only data baked into the
//! binary; the endpoint serving it has no failure modes.

use crate::models::EmergencyContact;

pub const EMERGENCY_CONTACTS: &[EmergencyContact] = &[
    EmergencyContact {
        name: "988 Suicide & Crisis Lifeline",
        phone: "988",
        description: "Free, confidential support for people in distress, 24/7. Call or text 988.",
    },
    EmergencyContact {
        name: "Crisis Text Line",
        phone: "741741",
        description: "Text HOME to 741741 to reach a trained crisis counselor, 24/7.",
    },
    EmergencyContact {
        name: "SAMHSA National Helpline",
        phone: "1-800-662-4357",
        description: "Treatment referral and information service for mental health and substance use, 24/7.",
    },
    EmergencyContact {
        name: "The Trevor Project",
        phone: "1-866-488-7386",
        description: "Crisis support for LGBTQ+ young people, 24/7.",
    },
    EmergencyContact {
        name: "Emergency Services",
        phone: "911",
        description: "If you or someone else is in immediate danger, call 911.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_non_empty_and_complete() {
        assert!(!EMERGENCY_CONTACTS.is_empty());
        for contact in EMERGENCY_CONTACTS {
            assert!(!contact.name.is_empty());
            assert!(!contact.phone.is_empty());
            assert!(!contact.description.is_empty());
        }
    }
}
