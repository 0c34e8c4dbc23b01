/// Words that mark a question as a request for personal contact details
pub const CONTACT_KEYWORDS: [&str; 5] = ["email", "phone", "contact", "reach", "linkedin"];

/// Fixed reply for contact requests
pub const CONTACT_DEFLECTION: &str = "Sorry, I cannot share personal contact details. You can connect with Maia on LinkedIn: https://uk.linkedin.com/in/maia-nagra and send a message there.";

/// Return the canned deflection if the query asks for contact details.
///
/// Matching is a case-insensitive substring test, so "reachable" or
/// "Contacts" also trigger it.
pub fn contact_guard(query: &str) -> Option<&'static str> {
    let query = query.to_lowercase();

    CONTACT_KEYWORDS
        .iter()
        .any(|keyword| query.contains(keyword))
        .then_some(CONTACT_DEFLECTION)
}
