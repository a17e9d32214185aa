//! Turns configuration plus a submitted form into an outgoing message.

use time::{macros::format_description, OffsetDateTime, UtcOffset};

use crate::app::{
    audit::AuditLog,
    config::Config,
    domain::{Address, Email, FormValues},
    template::{CompiledTemplates, Template},
};

/// One outgoing message. Built per request and discarded after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
    pub from: Address,
    pub reply_to: Address,
    /// Recipient list for logging only. Delivery uses the configured list.
    pub to: String,
}

impl Message {
    /// Sent-mail audit record for this message.
    pub fn audit_record(&self, date: OffsetDateTime) -> String {
        let rfc1123 = format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        );
        let date = date
            .to_offset(UtcOffset::UTC)
            .format(rfc1123)
            .unwrap_or_default();

        format!(
            "Date: {}\nTo: {}\nFrom: {}\nSubject: {}\n\n{}\n",
            date, self.to, self.from, self.subject, self.body
        )
    }
}

/// Static sender identity plus the compiled templates.
#[derive(Debug)]
pub struct MessageComposer {
    from_email: String,
    from_name: String,
    to: String,
    templates: CompiledTemplates,
}

impl MessageComposer {
    pub fn new(config: &Config, templates: CompiledTemplates) -> Self {
        Self {
            from_email: config.from_email.clone(),
            from_name: config.from_name.trim().to_string(),
            to: config
                .to
                .iter()
                .map(Email::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            templates,
        }
    }

    pub fn body_is_markup(&self) -> bool {
        self.templates.body_is_markup()
    }

    /// Build the message for one submission.
    ///
    /// Render failures are written to the error channel and the partial output
    /// is used; composing never fails.
    pub fn compose(&self, form: &FormValues, audit: &AuditLog) -> Message {
        let request_name = form.first("name");

        Message {
            subject: render(&self.templates.subject, "Render Subject Error", form, audit),
            body: render(&self.templates.body, "Render Error", form, audit),
            from: self.sender(request_name),
            reply_to: Address::new(form.first("email").unwrap_or_default().trim(), request_name),
            to: self.to.clone(),
        }
    }

    /// The configured address, shown as "<name> via <configured name>" when the
    /// submitter gave a name.
    fn sender(&self, request_name: Option<&str>) -> Address {
        let request_name = request_name.map(str::trim).filter(|n| !n.is_empty());

        let name = match (request_name, self.from_name.as_str()) {
            (Some(name), "") => name.to_string(),
            (Some(name), configured) => format!("{} via {}", name, configured),
            (None, configured) => configured.to_string(),
        };

        Address::new(self.from_email.as_str(), Some(name.as_str()))
    }
}

fn render(template: &Template, label: &str, form: &FormValues, audit: &AuditLog) -> String {
    let mut out = Vec::new();
    if let Err(err) = template.render(form, &mut out) {
        let written = String::from_utf8_lossy(&out);
        audit.write_error(format_args!(
            "{}: {} Form: {:?} Written: {:?}",
            label, err, form, written
        ));
        tracing::warn!(%err, "{}", label);
    }
    String::from_utf8_lossy(&out).into_owned()
}
