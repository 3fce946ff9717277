//! Deciding which emails a new lead triggers, and rendering them

use leadflow_domain::{Account, Lead, NotificationKind, NotificationRequest, OutboundEmail};

const DEFAULT_AUTO_REPLY_SUBJECT: &str = "Vielen Dank für Ihre Anfrage";
const DEFAULT_AUTO_REPLY_BODY: &str = "Hallo {{name}},\n\nvielen Dank für Ihre Anfrage. Wir \
                                       melden uns so schnell wie möglich bei \
                                       Ihnen.\n\nViele Grüße\n{{accountName}}";
const OWNER_SUBJECT: &str = "Neuer Lead: {{name}}";
const OWNER_BODY: &str = "Ein neuer Lead ist eingegangen.\n\nName: {{name}}\nE-Mail: \
                          {{email}}\nTelefon: {{phone}}\nQuelle: {{source}}";

/// Emails to send for a freshly ingested lead.
///
/// Auto-replies need the setting and a lead email; owner notifications need
/// the setting and a recipient address.
pub fn plan(account: &Account, lead: &Lead) -> Vec<NotificationRequest> {
    let settings = &account.email_settings;
    let mut requests = Vec::with_capacity(2);

    if settings.auto_reply_enabled {
        if let Some(email) = lead.email.as_deref().filter(|e| !e.trim().is_empty()) {
            requests.push(NotificationRequest {
                lead_id: lead.id,
                kind: NotificationKind::AutoReply,
                recipient_email: email.trim().to_string(),
                recipient_name: Some(lead.name.clone()),
                account_id: account.id,
            });
        }
    }

    if settings.owner_notification_enabled {
        if let Some(recipient) = account.notification_recipient() {
            requests.push(NotificationRequest {
                lead_id: lead.id,
                kind: NotificationKind::OwnerNotification,
                recipient_email: recipient.trim().to_string(),
                recipient_name: account.owner_name.clone(),
                account_id: account.id,
            });
        }
    }

    requests
}

/// Values available to `{{placeholder}}` substitution
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub name: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub source: &'a str,
    pub account_name: &'a str,
}

impl<'a> TemplateVars<'a> {
    pub fn new(account: &'a Account, lead: &'a Lead) -> Self {
        Self {
            name: &lead.name,
            first_name: lead.first_name.as_deref(),
            last_name: lead.last_name.as_deref(),
            email: lead.email.as_deref(),
            phone: lead.phone.as_deref(),
            source: &lead.source,
            account_name: &account.name,
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a str> {
        match key {
            "name" => Some(self.name),
            "firstName" => Some(self.first_name.unwrap_or_default()),
            "lastName" => Some(self.last_name.unwrap_or_default()),
            "email" => Some(self.email.unwrap_or_default()),
            "phone" => Some(self.phone.unwrap_or_default()),
            "source" => Some(self.source),
            "accountName" => Some(self.account_name),
            _ => None,
        }
    }
}

/// Substitute `{{key}}` markers. Unknown keys and unterminated markers are
/// left as written.
pub fn render_template(template: &str, vars: &TemplateVars<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match vars.lookup(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render the email for one planned request.
pub fn compose(
    request: &NotificationRequest,
    account: &Account,
    lead: &Lead,
    from_address: &str,
) -> OutboundEmail {
    let vars = TemplateVars::new(account, lead);
    let settings = &account.email_settings;

    let (subject, body) = match request.kind {
        NotificationKind::AutoReply => (
            settings.auto_reply_subject.as_deref().unwrap_or(DEFAULT_AUTO_REPLY_SUBJECT),
            settings.auto_reply_body.as_deref().unwrap_or(DEFAULT_AUTO_REPLY_BODY),
        ),
        NotificationKind::OwnerNotification => (OWNER_SUBJECT, OWNER_BODY),
    };

    OutboundEmail {
        to: request.recipient_email.clone(),
        to_name: request.recipient_name.clone(),
        from: from_address.to_string(),
        from_name: Some(settings.sender_name.clone().unwrap_or_else(|| account.name.clone())),
        subject: render_template(subject, &vars),
        text: render_template(body, &vars),
    }
}
