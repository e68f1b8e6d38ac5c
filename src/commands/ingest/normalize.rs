/// State directory name to display form: `andaman-&-nicobar-islands` → `Andaman & Nicobar Islands`.
pub fn state_name(dir_name: &str) -> String {
    title_case(&dir_name.replace('-', " "))
}

/// District label with the literal `district` token removed: `bengaluru urban district` → `Bengaluru Urban`.
pub fn district_name(raw: &str) -> String {
    title_case(raw.replace("district", "").trim())
}

/// Uppercases the first letter of every alphabetic run and lowercases the rest.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_alphabetic = false;
    for ch in input.chars() {
        if previous_alphabetic {
            output.extend(ch.to_lowercase());
        } else {
            output.extend(ch.to_uppercase());
        }
        previous_alphabetic = ch.is_alphabetic();
    }
    output
}
