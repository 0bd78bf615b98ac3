use onboarding_form::form::{FieldLens, FormModel};

#[derive(Clone, onboarding_form::form::FormModel)]
struct ContactForm {
    email: String,
    opt_in: Option<bool>,
}

fn main() {
    let fields = ContactForm::fields();
    let lens = fields.email();
    let mut model = ContactForm {
        email: "a@example.com".to_string(),
        opt_in: None,
    };
    lens.set(&mut model, "<em>b</em>@example.com".to_string());
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(fields.opt_in().get(&model), &None);
    assert_eq!(model.sanitized().email, "b@example.com");
    assert_eq!(ContactForm::field_keys().len(), 2);
}
