//! Deterministic reply templates, one per action type.
//!
//! Every letter opens with `Dear <sender>` (or `Dear Colleague` when
//! forwarding) and closes with `Best regards,`, the department signature and
//! the issue date in long form. Output depends only on the request, the
//! organization name and the issue instant.

use chrono::{DateTime, Utc};

use super::action::ActionType;
use super::generator::GenerationRequest;

/// Long date, e.g. `January 1, 2024`.
pub fn long_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Short numeric date, e.g. `1/15/2024`.
pub fn short_date(at: DateTime<Utc>) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

/// `REF-` plus the last six digits of the issue instant in milliseconds.
pub fn reference_number(at: DateTime<Utc>) -> String {
    format!("REF-{:06}", at.timestamp_millis().rem_euclid(1_000_000))
}

/// `"<organization> <Department> Department"`, without a leading space when
/// the organization is blank.
pub fn signature(organization: &str, request: &GenerationRequest) -> String {
    let department = format!("{} Department", request.department.title());
    match organization.trim() {
        "" => department,
        org => format!("{} {}", org, department),
    }
}

/// Render the letter for `request.action`.
pub fn render(request: &GenerationRequest, organization: &str, issued_at: DateTime<Utc>) -> String {
    let received = short_date(request.received_at);
    let subject = &request.subject;

    let (greeting, body) = match request.action {
        ActionType::Accept => (
            request.sender.as_str(),
            format!(
                "Thank you for your correspondence dated {received}.\n\n\
                 After careful review of your request regarding \"{subject}\", we are pleased to \
                 inform you that your request has been approved.\n\n\
                 We will proceed with the necessary arrangements and will keep you informed of any \
                 developments. If you have any questions or need further clarification, please do \
                 not hesitate to contact us."
            ),
        ),
        ActionType::Reject => (
            request.sender.as_str(),
            format!(
                "Thank you for your correspondence dated {received}.\n\n\
                 After careful consideration of your request regarding \"{subject}\", we regret to \
                 inform you that we are unable to accommodate your request at this time.\n\n\
                 This decision was made after thorough review of all relevant factors and \
                 applicable regulations. If you would like to discuss this matter further or have \
                 additional information to provide, please feel free to contact our office.\n\n\
                 We appreciate your understanding."
            ),
        ),
        ActionType::RequestInfo => (
            request.sender.as_str(),
            format!(
                "Thank you for your inquiry dated {received} regarding \"{subject}\".\n\n\
                 To properly process your request, we need additional information:\n\n\
                 1. [Please specify the required documentation]\n\
                 2. [Additional details needed]\n\
                 3. [Any clarifications required]\n\n\
                 Please provide the requested information at your earliest convenience. \
                 Once we receive the complete information, we will be able to proceed \
                 with your request.\n\n\
                 If you have any questions, please don't hesitate to contact us."
            ),
        ),
        ActionType::Forward => (
            "Colleague",
            format!(
                "I am forwarding the below email from {sender} regarding \"{subject}\" for your \
                 department's attention and appropriate action.\n\n\
                 Please review and respond directly to the sender at {sender_email}.\n\n\
                 Original message:\n\
                 From: {sender} <{sender_email}>\n\
                 Date: {received}\n\
                 Subject: {subject}\n\n\
                 {original}\n\n\
                 Thank you for your assistance.",
                sender = request.sender,
                sender_email = request.sender_email,
                original = request.body,
            ),
        ),
        ActionType::Acknowledge => (
            request.sender.as_str(),
            format!(
                "This message confirms receipt of your email dated {received} regarding \
                 \"{subject}\".\n\n\
                 Your request has been logged and assigned reference number {reference}. We are \
                 currently reviewing your inquiry and will respond with a detailed reply within \
                 3-5 business days.\n\n\
                 If you need to reference this matter in future correspondence, please include the \
                 reference number above.\n\n\
                 Thank you for your patience.",
                reference = reference_number(issued_at),
            ),
        ),
        ActionType::Custom => (
            request.sender.as_str(),
            format!(
                "Thank you for your email regarding \"{subject}\".\n\n\
                 [Please provide your custom response here]"
            ),
        ),
    };

    format!(
        "Dear {greeting},\n\n{body}\n\nBest regards,\n{signature}\n{date}",
        signature = signature(organization, request),
        date = long_date(issued_at),
    )
}
