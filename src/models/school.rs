use serde::Serialize;

/// Public school info for the resolved tenant, served unauthenticated so
/// the sign-in screen can show the school name.
#[derive(Debug, Serialize)]
pub struct SchoolInfo {
    pub slug: String,
    pub name: String,
    /// One-way latch: flipped false→true when the first counselor is
    /// bootstrapped, never back.
    pub has_counselor: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_info_field_names() {
        let info = SchoolInfo {
            slug: "cedar-grove".into(),
            name: "Cedar Grove".into(),
            has_counselor: true,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["slug"], "cedar-grove");
        assert_eq!(json["name"], "Cedar Grove");
        assert_eq!(json["has_counselor"], true);
    }
}
