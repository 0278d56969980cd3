//! Error Diagnostics
//!
//! Maps provider error codes to a human readable explanation and a suggested fix.

use crate::error::ProviderError;

/// Explanation and remedy for a provider error
#[derive(Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: &'static str,
    pub solution: &'static str,
}

/// Lookup table keyed by `"{type}-{code}"` or `"{code}"`
static DIAGNOSTICS: &[(&str, Diagnostic)] = &[
    // Authorization
    (
        "OAuthException-190",
        Diagnostic {
            message: "Invalid OAuth access token",
            solution: "Check that your access token is valid and has not expired. You may need to generate a new one.",
        },
    ),
    (
        "OAuthException-10",
        Diagnostic {
            message: "Application does not have permission for this action",
            solution: "Ensure your app has the required permissions. Check your app settings in the Meta Developer Portal.",
        },
    ),
    // Rate limiting
    (
        "OAuthException-80004",
        Diagnostic {
            message: "Rate limit hit",
            solution: "Your application is making too many requests. Implement rate limiting or exponential backoff.",
        },
    ),
    (
        "4-30",
        Diagnostic {
            message: "Too many messages sent to this number",
            solution: "You have exceeded the rate at which you can send messages to this user. Wait and try again later.",
        },
    ),
    (
        "80007",
        Diagnostic {
            message: "WhatsApp Business Account rate limit reached",
            solution: "The account has hit its messaging rate limit. Reduce request volume and retry later.",
        },
    ),
    (
        "130429",
        Diagnostic {
            message: "Cloud API throughput limit reached",
            solution: "Messages are being sent faster than the phone number's throughput allows. Slow down and retry.",
        },
    ),
    (
        "131056",
        Diagnostic {
            message: "Pair rate limit hit",
            solution: "Too many messages were sent from this number to the same recipient in a short time. Wait before messaging them again.",
        },
    ),
    // Message content
    (
        "GraphMethodException-100",
        Diagnostic {
            message: "Invalid parameter",
            solution: "One or more parameters in your request are invalid. Check the error details for specific fields to fix.",
        },
    ),
    (
        "131000",
        Diagnostic {
            message: "Message failed to send",
            solution: "The message failed to send. Check that the recipient is a valid WhatsApp user and try again.",
        },
    ),
    (
        "131005",
        Diagnostic {
            message: "Message content contains blocked keywords",
            solution: "Your message contains content that is blocked by WhatsApp. Modify your message and try again.",
        },
    ),
    (
        "131014",
        Diagnostic {
            message: "Template not approved",
            solution: "The template you are trying to use has not been approved. Check the status of your template in the Meta Business Manager.",
        },
    ),
    (
        "131047",
        Diagnostic {
            message: "Re-engagement message",
            solution: "More than 24 hours have passed since the recipient last replied. Send an approved template message instead.",
        },
    ),
    // Media
    (
        "131009",
        Diagnostic {
            message: "Media upload failed",
            solution: "The media upload failed. Ensure the file is a supported format and size (images < 5MB, videos < 16MB, documents < 100MB).",
        },
    ),
    (
        "131051",
        Diagnostic {
            message: "Media file not found",
            solution: "The media file you are trying to send could not be found. Check the media ID or URL.",
        },
    ),
    // Phone numbers
    (
        "132000",
        Diagnostic {
            message: "Phone number not WhatsApp enabled",
            solution: "The phone number you are trying to use is not enabled for WhatsApp Business API. Verify the number in Meta Business Manager.",
        },
    ),
    (
        "132001",
        Diagnostic {
            message: "Phone number not verified",
            solution: "The recipient phone number is not a verified WhatsApp user. Ensure the number is correct and the user has WhatsApp installed.",
        },
    ),
];

static DEFAULT: Diagnostic = Diagnostic {
    message: "An unexpected error occurred",
    solution: "Please check the error details and try again. If the issue persists, contact Meta support.",
};

fn lookup(key: &str) -> Option<&'static Diagnostic> {
    DIAGNOSTICS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, diagnostic)| diagnostic)
}

/// Find the diagnostic for an error: `type-code`, then `code`, then the generic entry
pub fn classify(error: &ProviderError) -> &'static Diagnostic {
    lookup(&format!("{}-{}", error.kind, error.code))
        .or_else(|| lookup(&error.code.to_string()))
        .unwrap_or(&DEFAULT)
}

/// Return a copy of `error` with its diagnostic attached.
///
/// The original message is left untouched; the explanation is rendered by
/// `Display`, so enriching an already enriched error changes nothing.
pub fn enrich(error: &ProviderError) -> ProviderError {
    ProviderError {
        diagnostic: Some(classify(error)),
        ..error.clone()
    }
}
