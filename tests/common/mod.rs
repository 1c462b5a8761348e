#![allow(dead_code)]

use form_autofill::profile::UserProfile;
use serde_json::json;

/// Markup of the sample application form: a name, a newsletter radio pair,
/// a resume upload and the apply button.
pub const APPLICATION_FORM: &str = r#"<form>
  <label>First name <input type="text" data-ui="first-name" name="firstName" required></label>
  <fieldset>
    <legend>Subscribe to newsletter?</legend>
    <input type="radio" name="newsletter" id="newsletter-yes" value="yes"><label for="newsletter-yes">Yes</label>
    <input type="radio" name="newsletter" id="newsletter-no" value="no"><label for="newsletter-no">No</label>
  </fieldset>
  <label>Resume <input type="file" data-ui="resume"></label>
  <button type="submit" data-ui="apply-button">Apply</button>
</form>"#;

/// Extraction reply as a chatty model writes it: prose, a fence, one entry
/// per radio input, and the submit button inline.
pub const EXTRACTION_REPLY: &str = r#"Sure! Here is the schema for the form:

```json
{
  "fields": [
    {"type": "text", "data-ui": "first-name", "name": "firstName", "label": "First name", "required": true},
    {"type": "radio", "name": "newsletter", "id": "newsletter-yes", "value": "yes", "option_label": "Yes", "label": "Subscribe to newsletter?"},
    {"type": "radio", "name": "newsletter", "id": "newsletter-no", "value": "no", "option_label": "No"},
    {"type": "file", "data-ui": "resume", "label": "Resume"},
    {"type": "submit", "data-ui": "apply-button", "text": "Apply"}
  ]
}
```

Let me know if you need anything else."#;

/// Synthesis reply matching `EXTRACTION_REPLY`. The radio answer uses the
/// option label rather than its value.
pub fn synthesis_reply(newsletter: &str) -> String {
    json!({
        "fields": [
            {"type": "text", "data-ui": "first-name", "name": "firstName", "label": "First name", "value": "Ada"},
            {
                "type": "radio",
                "name": "newsletter",
                "id": "newsletter-yes",
                "label": "Subscribe to newsletter?",
                "options": [{"value": "yes", "label": "Yes"}, {"value": "no", "label": "No"}],
                "value": newsletter
            },
            {"type": "file", "data-ui": "resume", "label": "Resume", "value": "resume.pdf"}
        ]
    })
    .to_string()
}

pub fn sample_profile() -> UserProfile {
    UserProfile::from_value(json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com",
        "newsletter": true
    }))
    .expect("profile fixture is an object")
}

pub const CONSENT: &str = r#"//label[contains(@class, "cb-lb")]/input[@type="checkbox"]"#;
