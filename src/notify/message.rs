// src/notify/message.rs
use html_escape::encode_text;

use crate::feed::IncidentRecord;

pub const PUSH_PRIORITY: &str = "urgent";
pub const PUSH_TAGS: &str = "police,alert,orlando";

/// What the push channel sends: plain body plus header metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub priority: &'static str,
    pub tags: &'static str,
}

/// Provider-agnostic email payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn alert_reason(term: &str) -> String {
    format!("This call contains \"{term}\" in the location field.")
}

pub fn alert_title(term: &str) -> String {
    format!("Orlando PD Alert: {term}")
}

pub fn push_message(rec: &IncidentRecord, term: &str) -> PushMessage {
    let body = format!(
        "ORLANDO PD ALERT: {term}\n\n\
         Type: {}\n\
         Time: {}\n\
         Location: {}\n\
         District: {}\n\
         Incident: {}\n\n\
         {}",
        rec.call_type,
        rec.occurred_text,
        rec.location,
        rec.district,
        rec.incident_id,
        alert_reason(term),
    );
    PushMessage {
        title: alert_title(term),
        body,
        priority: PUSH_PRIORITY,
        tags: PUSH_TAGS,
    }
}

const CELL: &str = "padding: 12px; border: 1px solid #ddd;";
const SHADED: &str = " style=\"background-color: #f8f9fa;\"";

fn row(label: &str, value: &str, shaded: bool, emphasize: bool) -> String {
    let value_style = if emphasize {
        format!("{CELL} color: #d73502; font-weight: bold;")
    } else {
        CELL.to_string()
    };
    format!(
        "<tr{}><td style=\"{CELL} font-weight: bold;\">{label}:</td><td style=\"{value_style}\">{}</td></tr>\n",
        if shaded { SHADED } else { "" },
        encode_text(value),
    )
}

pub fn email_message(rec: &IncidentRecord, term: &str) -> EmailMessage {
    let subject = format!("{} - {}", alert_title(term), rec.call_type);
    let term_html = encode_text(term);

    let mut rows = String::new();
    rows.push_str(&row("Incident Type", &rec.call_type, true, false));
    rows.push_str(&row("Time", &rec.occurred_text, false, false));
    rows.push_str(&row("Location", &rec.location, true, true));
    rows.push_str(&row("District", &rec.district, false, false));
    rows.push_str(&row("Incident Number", &rec.incident_id, true, false));

    let html = format!(
        "<html>\n<body>\n\
         <h2>&#128680; Orlando PD Alert: {term_html}</h2>\n\
         <table style=\"border-collapse: collapse; width: 100%; max-width: 600px;\">\n{rows}</table>\n\
         <p style=\"margin-top: 20px; padding: 12px; background-color: #fff3cd; border: 1px solid #ffeeba; border-radius: 4px;\">\
         <strong>Alert Reason:</strong> This call contains \"<strong>{term_html}</strong>\" in the location field.</p>\n\
         <p style=\"color: #6c757d; font-size: 12px; margin-top: 20px;\">\
         This is an automated notification from Orlando PD Monitor.<br>\
         Data source: Orlando Police Department Active Calls Feed</p>\n\
         </body>\n</html>\n"
    );

    let text = format!(
        "{}\n\n\
         Incident Type: {}\n\
         Time: {}\n\
         Location: {}\n\
         District: {}\n\
         Incident Number: {}\n\n\
         Alert Reason: {}\n\n\
         ---\n\
         This is an automated notification from Orlando PD Monitor.\n\
         Data source: Orlando Police Department Active Calls Feed\n",
        alert_title(term),
        rec.call_type,
        rec.occurred_text,
        rec.location,
        rec.district,
        rec.incident_id,
        alert_reason(term),
    );

    EmailMessage {
        subject,
        html,
        text,
    }
}
