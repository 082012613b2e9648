use super::*;
use crate::config::{Config, DEFAULT_API_URL};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

fn test_config() -> Config {
    Config {
        api_key: "SG.test".to_string(),
        from_email: "wordpress@example.com".to_string(),
        from_name: "WordPress".to_string(),
        content_type: "text/html".to_string(),
        template_id: String::new(),
        api_url: DEFAULT_API_URL.to_string(),
        timeout_secs: 30,
    }
}

fn assemble_with(config: &Config, filters: &Filters, request: &MailRequest) -> OutboundMessage {
    MessageAssembler::new(config, filters, &FsAttachmentReader)
        .assemble(request)
        .expect("Assembly failed")
}

fn assemble(request: &MailRequest) -> OutboundMessage {
    assemble_with(&test_config(), &Filters::default(), request)
}

#[test]
fn test_defaults_without_headers() {
    let message = assemble(&MailRequest::new("a@b.com", "Hi", "<p>hello</p>"));

    assert_eq!(message.from_email, "wordpress@example.com");
    assert_eq!(message.from_name, "WordPress");
    assert_eq!(message.to, vec![AddressEntry::new("", "a@b.com")]);
    assert_eq!(message.subject, "Hi");
    assert_eq!(message.body, "<p>hello</p>");
    assert_eq!(message.content_type, "text/html");
    assert!(message.cc.is_empty());
    assert!(message.bcc.is_empty());
    assert!(message.reply_to.is_empty());
    assert!(message.attachments.is_empty());
    assert_eq!(message.template_id, None);
    assert_eq!(message.categories, vec![CATEGORY.to_string()]);
    assert!(message.headers.is_empty());
}

#[test]
fn test_from_header_overrides_defaults() {
    let request = MailRequest::new("a@b.com", "Hi", "body")
        .with_headers("From: Jane Doe <jane@x.com>\r\nContent-Type: text/plain; charset=UTF-8");
    let message = assemble(&request);

    assert_eq!(message.from_name, "Jane Doe");
    assert_eq!(message.from_email, "jane@x.com");
    assert_eq!(message.content_type, "text/plain");
}

#[test]
fn test_bare_from_keeps_default_name() {
    let message = assemble(&MailRequest::new("a@b.com", "Hi", "body").with_headers("From: jane@x.com"));

    assert_eq!(message.from_email, "jane@x.com");
    assert_eq!(message.from_name, "WordPress");
}

#[test]
fn test_recipient_lists() {
    let request = MailRequest::new("Ann <ann@x.com>, bob@x.com", "Hi", "body").with_headers(vec![
        "Cc: a@x.com",
        "Cc: b@x.com, Carl <c@x.com>",
        "Bcc: hidden@x.com",
        "Reply-To: Support <help@x.com>, other@x.com",
    ]);
    let message = assemble(&request);

    assert_eq!(
        message.to,
        vec![AddressEntry::new("Ann", "ann@x.com"), AddressEntry::new("", "bob@x.com")]
    );
    assert_eq!(
        message.cc,
        vec![
            AddressEntry::new("", "a@x.com"),
            AddressEntry::new("", "b@x.com"),
            AddressEntry::new("Carl", "c@x.com"),
        ]
    );
    assert_eq!(message.bcc, vec![AddressEntry::new("", "hidden@x.com")]);
    assert_eq!(
        message.reply_to,
        vec![AddressEntry::new("Support", "help@x.com"), AddressEntry::new("", "other@x.com")]
    );
}

#[test]
fn test_recipient_list_items_are_not_split() {
    let request = MailRequest::new(vec!["\"Doe, Jane\" <jane@x.com>", "b@x.com"], "Hi", "body");
    let message = assemble(&request);

    assert_eq!(
        message.to,
        vec![AddressEntry::new("Doe, Jane", "jane@x.com"), AddressEntry::new("", "b@x.com")]
    );
}

#[test]
fn test_empty_recipients_are_skipped() {
    let request = MailRequest::new("a@b.com,, ", "Hi", "body").with_headers("Cc:\nBcc: ,x@y.com");
    let message = assemble(&request);

    assert_eq!(message.to, vec![AddressEntry::new("", "a@b.com")]);
    assert!(message.cc.is_empty());
    assert_eq!(message.bcc, vec![AddressEntry::new("", "x@y.com")]);
}

#[test]
fn test_extra_headers_are_kept() {
    let message =
        assemble(&MailRequest::new("a@b.com", "Hi", "body").with_headers("X-Mailer: test\nX-Priority: 1"));

    assert_eq!(message.headers.get("x-mailer"), Some("test"));
    assert_eq!(message.headers.get("X-Priority"), Some("1"));
}

#[test]
fn test_template_data_caller_wins() {
    let mut data = Map::new();
    data.insert("subject".to_string(), json!("Custom"));
    data.insert("cta".to_string(), json!({"url": "https://example.com"}));

    let message = assemble(&MailRequest::new("a@b.com", "S", "B").with_template_data(data));

    assert_eq!(message.template_data["subject"], json!("Custom"));
    assert_eq!(message.template_data["body"], json!("B"));
    assert_eq!(message.template_data["cta"]["url"], json!("https://example.com"));
    // The message subject itself is untouched.
    assert_eq!(message.subject, "S");
}

#[test]
fn test_template_id_resolution() {
    let mut config = test_config();
    let filters = Filters::default();

    let message = assemble_with(&config, &filters, &MailRequest::new("a@b.com", "Hi", "body"));
    assert_eq!(message.template_id, None);

    config.template_id = "d-default".to_string();
    let message = assemble_with(&config, &filters, &MailRequest::new("a@b.com", "Hi", "body"));
    assert_eq!(message.template_id.as_deref(), Some("d-default"));

    let message = assemble_with(
        &config,
        &filters,
        &MailRequest::new("a@b.com", "Hi", "body").with_template_id("d-explicit"),
    );
    assert_eq!(message.template_id.as_deref(), Some("d-explicit"));

    let message = assemble_with(
        &config,
        &filters,
        &MailRequest::new("a@b.com", "Hi", "body").with_template_id(""),
    );
    assert_eq!(message.template_id.as_deref(), Some("d-default"));
}

#[test]
fn test_filters_see_resolved_values() {
    let filters = Filters::default()
        .on_from(|email| email.to_uppercase())
        .on_from_name(|name| format!("{} (via site)", name))
        .on_content_type(|ct| if ct == "text/plain" { "text/html".to_string() } else { ct })
        .on_template_id(|_| String::new());

    let mut config = test_config();
    config.template_id = "d-default".to_string();

    let request = MailRequest::new("a@b.com", "Hi", "body")
        .with_headers("From: Jane <jane@x.com>\nContent-Type: text/plain");
    let message = assemble_with(&config, &filters, &request);

    assert_eq!(message.from_email, "JANE@X.COM");
    assert_eq!(message.from_name, "Jane (via site)");
    assert_eq!(message.content_type, "text/html");
    assert_eq!(message.template_id, None);
}

#[test]
fn test_template_id_filter_only_applies_to_default() {
    let filters = Filters::default().on_template_id(|id| format!("{}-filtered", id));
    let mut config = test_config();
    config.template_id = "d-default".to_string();

    let message = assemble_with(
        &config,
        &filters,
        &MailRequest::new("a@b.com", "Hi", "body").with_template_id("d-explicit"),
    );
    assert_eq!(message.template_id.as_deref(), Some("d-explicit"));

    let message = assemble_with(&config, &filters, &MailRequest::new("a@b.com", "Hi", "body"));
    assert_eq!(message.template_id.as_deref(), Some("d-default-filtered"));
}

#[test]
fn test_attachments_are_encoded() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("report.txt");
    let second = dir.path().join("data.csv");
    std::fs::File::create(&first)
        .and_then(|mut f| f.write_all(b"hello"))
        .expect("Failed to write attachment");
    std::fs::write(&second, b"a,b\n1,2\n").expect("Failed to write attachment");

    let paths = format!("{}\r\n{}\n", first.display(), second.display());
    let message = assemble(&MailRequest::new("a@b.com", "Hi", "body").with_attachments(paths.as_str()));

    assert_eq!(message.attachments.len(), 2);
    assert_eq!(
        message.attachments[0],
        Attachment {
            filename: "report.txt".to_string(),
            content: "aGVsbG8=".to_string(),
            mime_type: ATTACHMENT_MIME_TYPE.to_string(),
            disposition: ATTACHMENT_DISPOSITION.to_string(),
        }
    );
    assert_eq!(message.attachments[1].filename, "data.csv");
    assert_eq!(message.attachments[1].content, "YSxiCjEsMgo=");
}

#[test]
fn test_missing_attachment_fails() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("missing.pdf");

    let request =
        MailRequest::new("a@b.com", "Hi", "body").with_attachments(vec![missing.clone()]);
    let err = MessageAssembler::new(&test_config(), &Filters::default(), &FsAttachmentReader)
        .assemble(&request)
        .expect_err("Missing attachment must fail");

    match err {
        MailError::AttachmentRead { path, .. } => assert_eq!(path, missing),
        other => panic!("Expected AttachmentRead, got {:?}", other),
    }
}

#[test]
fn test_blank_attachment_entries_are_ignored() {
    assert!(RawAttachments::from("").paths().is_empty());
    assert!(RawAttachments::from("\r\n  \n").paths().is_empty());
    assert!(RawAttachments::from(vec![PathBuf::new()]).paths().is_empty());
}

#[test]
fn test_assemble_is_idempotent() {
    let mut data = Map::new();
    data.insert("name".to_string(), json!("Ann"));
    let request = MailRequest::new("Ann <ann@x.com>", "Hi", "body")
        .with_headers("Cc: a@x.com, b@x.com\nX-Id: 7\nFrom: Site <site@x.com>")
        .with_template_data(data)
        .with_template_id("d-1");

    assert_eq!(assemble(&request), assemble(&request));
}

#[test]
fn test_mail_request_from_json() {
    let request: MailRequest = serde_json::from_str(
        r#"{
            "to": "a@b.com, c@d.com",
            "subject": "Hi",
            "message": "body",
            "headers": ["Cc: e@f.com"],
            "template_data": {"name": "Ann"}
        }"#,
    )
    .expect("Deserialization failed");

    assert_eq!(request.to, Recipients::from("a@b.com, c@d.com"));
    assert_eq!(request.attachments, RawAttachments::default());
    assert_eq!(request.template_id, None);

    let message = assemble(&request);
    assert_eq!(message.to.len(), 2);
    assert_eq!(message.cc, vec![AddressEntry::new("", "e@f.com")]);
    assert_eq!(message.template_data["name"], json!("Ann"));
}
