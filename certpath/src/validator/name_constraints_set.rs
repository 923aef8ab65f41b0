//! Structures and functions related to processing name constraints

use core::mem::discriminant;

use const_oid::db::rfc3280::EMAIL_ADDRESS;
use x509_cert::ext::pkix::{
    constraints::name::{GeneralSubtree, GeneralSubtrees},
    name::GeneralName,
};
use x509_cert::name::Name;

use crate::{util::pdv_utilities::*, ParsedCertificate};

/// The `NameConstraintsSet` structure is used to track permitted_subtrees or excluded_subtrees while
/// walking a certification path from the trust anchor toward the end entity.
///
/// For each supported name form, an empty vector indicates nothing has been set (i.e., no excluded
/// names and infinite permitted names) and the corresponding `_null` flag indicates an intersection
/// operation resulted in the empty set, i.e., no names of that form are permitted.
///
/// Constraints on name forms other than directory names, rfc822 names, DNS names and URIs are
/// collected in not_supported. Names of those forms are rejected when any such constraint has been
/// collected.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct NameConstraintsSet {
    /// rfc822_name governs use of email addresses in SANs and the subject emailAddress attribute
    pub rfc822_name: Vec<GeneralSubtree>,
    /// rfc822_name_null is initialized to false and set to true if an intersection operation yields empty set
    pub rfc822_name_null: bool,
    /// dns_name governs use of DNS names in SANs
    pub dns_name: Vec<GeneralSubtree>,
    /// dns_name_null is initialized to false and set to true if an intersection operation yields empty set
    pub dns_name_null: bool,
    /// directory_name governs use of DNs in SANs and subject fields
    pub directory_name: Vec<GeneralSubtree>,
    /// directory_name_null is initialized to false and set to true if an intersection operation yields empty set
    pub directory_name_null: bool,
    /// uniform_resource_identifier governs use of URIs in SANs
    pub uniform_resource_identifier: Vec<GeneralSubtree>,
    /// uniform_resource_identifier_null is initialized to false and set to true if an intersection operation yields empty set
    pub uniform_resource_identifier_null: bool,
    /// not_supported collects constraints on unsupported name forms
    pub not_supported: Vec<GeneralSubtree>,
}

/// Returns true if name falls within the subtree. Names of a different form never match.
fn name_within_subtree(subtree: &GeneralSubtree, name: &GeneralName) -> bool {
    match (&subtree.base, name) {
        (GeneralName::Rfc822Name(base), GeneralName::Rfc822Name(n)) => {
            descended_from_rfc822(base, n.as_str())
        }
        (GeneralName::DnsName(base), GeneralName::DnsName(n)) => {
            descended_from_host(base, n.as_str(), false)
        }
        (GeneralName::DirectoryName(base), GeneralName::DirectoryName(n)) => {
            descended_from_dn(base, n)
        }
        (
            GeneralName::UniformResourceIdentifier(base),
            GeneralName::UniformResourceIdentifier(n),
        ) => {
            match host_from_uri(n.as_str()) {
                Some(host) => descended_from_host(base, host.as_str(), true),
                None => false,
            }
        }
        _ => false,
    }
}

/// Returns true if the inner constraint describes a subset of the outer constraint.
fn subtree_within_subtree(outer: &GeneralSubtree, inner: &GeneralSubtree) -> bool {
    if outer == inner {
        return true;
    }
    match (&outer.base, &inner.base) {
        (GeneralName::Rfc822Name(o), GeneralName::Rfc822Name(i)) => {
            if i.as_str().contains('@') {
                descended_from_rfc822(o, i.as_str())
            } else {
                !o.as_str().contains('@') && descended_from_host(o, i.as_str(), true)
            }
        }
        (GeneralName::DnsName(o), GeneralName::DnsName(i)) => {
            descended_from_host(o, i.as_str(), false)
        }
        (GeneralName::DirectoryName(o), GeneralName::DirectoryName(i)) => descended_from_dn(o, i),
        (GeneralName::UniformResourceIdentifier(o), GeneralName::UniformResourceIdentifier(i)) => {
            descended_from_host(o, i.as_str(), true)
        }
        _ => false,
    }
}

/// Intersects the constraints of one name form held in state with those of the same form in
/// new_names. Nothing changes when new_names holds no constraint of that form.
fn intersect_form(
    state: &mut Vec<GeneralSubtree>,
    null: &mut bool,
    new_names: &GeneralSubtrees,
    is_form: fn(&GeneralName) -> bool,
) {
    if *null || !new_names.iter().any(|s| is_form(&s.base)) {
        // nothing to intersect (either state has become NULL or there are no names to add)
        return;
    }

    let new_of_form = new_names.iter().filter(|s| is_form(&s.base));

    let mut new_set: Vec<GeneralSubtree> = Vec::new();
    if state.is_empty() {
        new_set.extend(new_of_form.cloned());
    } else {
        for new_name in new_of_form {
            for prev_name in state.iter() {
                let narrower = if subtree_within_subtree(prev_name, new_name) {
                    new_name
                } else if subtree_within_subtree(new_name, prev_name) {
                    prev_name
                } else {
                    continue;
                };
                if !new_set.contains(narrower) {
                    new_set.push(narrower.clone());
                }
            }
        }
    }

    if new_set.is_empty() {
        *null = true;
        state.clear();
    } else {
        *state = new_set;
    }
}

impl NameConstraintsSet {
    //----------------------------------------------------------------------------
    // public
    //----------------------------------------------------------------------------
    /// `calculate_intersection` calculates the intersection of self and ext and saves the result in self.
    /// Used to accumulate permitted subtrees.
    pub fn calculate_intersection(&mut self, ext: &GeneralSubtrees) {
        intersect_form(
            &mut self.directory_name,
            &mut self.directory_name_null,
            ext,
            |gn| matches!(gn, GeneralName::DirectoryName(_)),
        );
        intersect_form(
            &mut self.rfc822_name,
            &mut self.rfc822_name_null,
            ext,
            |gn| matches!(gn, GeneralName::Rfc822Name(_)),
        );
        intersect_form(
            &mut self.dns_name,
            &mut self.dns_name_null,
            ext,
            |gn| matches!(gn, GeneralName::DnsName(_)),
        );
        intersect_form(
            &mut self.uniform_resource_identifier,
            &mut self.uniform_resource_identifier_null,
            ext,
            |gn| matches!(gn, GeneralName::UniformResourceIdentifier(_)),
        );
        for subtree in ext {
            if bucket_index(&subtree.base).is_none() && !self.not_supported.contains(subtree) {
                self.not_supported.push(subtree.clone());
            }
        }
    }

    /// `calculate_union` calculates the union of self and ext and saves the result in self. Used to
    /// accumulate excluded subtrees.
    pub fn calculate_union(&mut self, ext: &GeneralSubtrees) {
        for subtree in ext {
            let bucket = match bucket_index(&subtree.base) {
                Some(0) => &mut self.rfc822_name,
                Some(1) => &mut self.dns_name,
                Some(2) => &mut self.directory_name,
                Some(_) => &mut self.uniform_resource_identifier,
                None => &mut self.not_supported,
            };
            if !bucket.contains(subtree) {
                bucket.push(subtree.clone());
            }
        }
    }

    /// `are_any_empty` returns true if an intersection operation has yielded the empty set for any
    /// supported name form.
    pub fn are_any_empty(&self) -> bool {
        self.rfc822_name_null
            || self.dns_name_null
            || self.directory_name_null
            || self.uniform_resource_identifier_null
    }

    fn bucket(&self, name: &GeneralName) -> Option<(&[GeneralSubtree], bool)> {
        match bucket_index(name) {
            Some(0) => Some((&self.rfc822_name, self.rfc822_name_null)),
            Some(1) => Some((&self.dns_name, self.dns_name_null)),
            Some(2) => Some((&self.directory_name, self.directory_name_null)),
            Some(_) => Some((
                &self.uniform_resource_identifier,
                self.uniform_resource_identifier_null,
            )),
            None => None,
        }
    }

    fn has_unsupported_of_form(&self, name: &GeneralName) -> bool {
        self.not_supported
            .iter()
            .any(|ns| discriminant(&ns.base) == discriminant(name))
    }

    /// `name_within_permitted_subtrees` returns true if name is within at least one permitted
    /// subtree of the same form, or if no constraint on that form has been set.
    pub fn name_within_permitted_subtrees(&self, name: &GeneralName) -> bool {
        if let GeneralName::DirectoryName(dn) = name {
            if dn.0.is_empty() {
                // NULL subjects get a free pass
                return true;
            }
        }
        match self.bucket(name) {
            Some((_, true)) => false,
            Some((subtrees, false)) => {
                subtrees.is_empty() || subtrees.iter().any(|s| name_within_subtree(s, name))
            }
            None => !self.has_unsupported_of_form(name),
        }
    }

    /// `name_within_excluded_subtrees` returns true if name is within at least one excluded subtree.
    pub fn name_within_excluded_subtrees(&self, name: &GeneralName) -> bool {
        if let GeneralName::DirectoryName(dn) = name {
            if dn.0.is_empty() {
                return false;
            }
        }
        match self.bucket(name) {
            Some((subtrees, null)) => null || subtrees.iter().any(|s| name_within_subtree(s, name)),
            None => self.has_unsupported_of_form(name),
        }
    }

    /// `email_within_permitted_subtrees` returns true if an email address taken from a subject
    /// emailAddress attribute is within the permitted rfc822 subtrees.
    pub fn email_within_permitted_subtrees(&self, addr: &str) -> bool {
        if self.rfc822_name_null {
            return false;
        }
        self.rfc822_name.is_empty()
            || self.rfc822_name.iter().any(|s| match &s.base {
                GeneralName::Rfc822Name(base) => descended_from_rfc822(base, addr),
                _ => false,
            })
    }

    /// `email_within_excluded_subtrees` returns true if an email address taken from a subject
    /// emailAddress attribute is within an excluded rfc822 subtree.
    pub fn email_within_excluded_subtrees(&self, addr: &str) -> bool {
        self.rfc822_name.iter().any(|s| match &s.base {
            GeneralName::Rfc822Name(base) => descended_from_rfc822(base, addr),
            _ => false,
        })
    }

    /// `permits_certificate` returns true if the subject name, each subject emailAddress attribute
    /// and each subject alternative name of the certificate is within the permitted subtrees.
    pub fn permits_certificate(&self, cert: &ParsedCertificate) -> bool {
        if !self.name_within_permitted_subtrees(&GeneralName::DirectoryName(cert.subject.clone())) {
            log_error_for_cert(cert, "subject name is not within permitted subtrees");
            return false;
        }
        for email in get_attribute_values(&cert.subject, &EMAIL_ADDRESS) {
            if !self.email_within_permitted_subtrees(email.as_str()) {
                log_error_for_cert(cert, "subject email address is not within permitted subtrees");
                return false;
            }
        }
        for san in &cert.subject_alt_names {
            if !self.name_within_permitted_subtrees(san) {
                log_error_for_cert(
                    cert,
                    "subject alternative name is not within permitted subtrees",
                );
                return false;
            }
        }
        true
    }

    /// `excludes_certificate` returns true if the subject name, any subject emailAddress attribute
    /// or any subject alternative name of the certificate is within the excluded subtrees.
    pub fn excludes_certificate(&self, cert: &ParsedCertificate) -> bool {
        if self.name_within_excluded_subtrees(&GeneralName::DirectoryName(cert.subject.clone())) {
            log_error_for_cert(cert, "subject name is within excluded subtrees");
            return true;
        }
        for email in get_attribute_values(&cert.subject, &EMAIL_ADDRESS) {
            if self.email_within_excluded_subtrees(email.as_str()) {
                log_error_for_cert(cert, "subject email address is within excluded subtrees");
                return true;
            }
        }
        for san in &cert.subject_alt_names {
            if self.name_within_excluded_subtrees(san) {
                log_error_for_cert(cert, "subject alternative name is within excluded subtrees");
                return true;
            }
        }
        false
    }
}

/// Maps supported name forms to a bucket: rfc822, dns, dn, uri.
fn bucket_index(name: &GeneralName) -> Option<usize> {
    match name {
        GeneralName::Rfc822Name(_) => Some(0),
        GeneralName::DnsName(_) => Some(1),
        GeneralName::DirectoryName(_) => Some(2),
        GeneralName::UniformResourceIdentifier(_) => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use der::asn1::Ia5String;

    fn dns(s: &str) -> GeneralSubtree {
        GeneralSubtree {
            base: GeneralName::DnsName(Ia5String::new(s).unwrap()),
            minimum: 0,
            maximum: None,
        }
    }

    fn dn(s: &str) -> GeneralSubtree {
        GeneralSubtree {
            base: GeneralName::DirectoryName(Name::from_str(s).unwrap()),
            minimum: 0,
            maximum: None,
        }
    }

    fn dns_name(s: &str) -> GeneralName {
        GeneralName::DnsName(Ia5String::new(s).unwrap())
    }

    #[test]
    fn intersection_tests() {
        let mut perm = NameConstraintsSet::default();
        assert!(perm.name_within_permitted_subtrees(&dns_name("anything.test")));

        perm.calculate_intersection(&vec![dns("example.com")]);
        assert!(perm.name_within_permitted_subtrees(&dns_name("host.example.com")));
        assert!(!perm.name_within_permitted_subtrees(&dns_name("www.tls.test")));

        // narrowing keeps the more specific subtree
        perm.calculate_intersection(&vec![dns("sub.example.com")]);
        assert_eq!(vec![dns("sub.example.com")], perm.dns_name);
        assert!(!perm.name_within_permitted_subtrees(&dns_name("host.example.com")));

        // a constraint on a different form leaves DNS untouched
        perm.calculate_intersection(&vec![dn("O=certpath,C=US")]);
        assert_eq!(1, perm.dns_name.len());
        assert!(!perm.are_any_empty());

        // disjoint subtrees yield the empty set
        perm.calculate_intersection(&vec![dns("other.test")]);
        assert!(perm.dns_name_null);
        assert!(perm.are_any_empty());
        assert!(!perm.name_within_permitted_subtrees(&dns_name("sub.example.com")));
    }

    #[test]
    fn union_tests() {
        let mut excl = NameConstraintsSet::default();
        assert!(!excl.name_within_excluded_subtrees(&dns_name("www.tls.test")));
        excl.calculate_union(&vec![dns("tls.test"), dn("CN=Bad,O=certpath,C=US")]);
        excl.calculate_union(&vec![dns("tls.test")]);
        assert_eq!(1, excl.dns_name.len());
        assert!(excl.name_within_excluded_subtrees(&dns_name("www.tls.test")));
        assert!(!excl.name_within_excluded_subtrees(&dns_name("example.com")));

        let bad = GeneralName::DirectoryName(Name::from_str("CN=Bad,O=certpath,C=US").unwrap());
        let good = GeneralName::DirectoryName(Name::from_str("CN=Good,O=certpath,C=US").unwrap());
        assert!(excl.name_within_excluded_subtrees(&bad));
        assert!(!excl.name_within_excluded_subtrees(&good));
    }

    #[test]
    fn certificate_tests() {
        use crate::parse_cert;

        let nc_ca =
            parse_cert(include_bytes!("../../tests/examples/nc_ca.der"), "nc_ca.der").unwrap();
        let good =
            parse_cert(include_bytes!("../../tests/examples/nc_good.der"), "nc_good.der").unwrap();
        let bad =
            parse_cert(include_bytes!("../../tests/examples/nc_bad.der"), "nc_bad.der").unwrap();

        let mut perm = NameConstraintsSet::default();
        let mut excl = NameConstraintsSet::default();
        let nc = nc_ca.name_constraints.clone().unwrap();
        if let Some(p) = &nc.permitted_subtrees {
            perm.calculate_intersection(p);
        }
        if let Some(e) = &nc.excluded_subtrees {
            excl.calculate_union(e);
        }
        assert!(perm.permits_certificate(&good));
        assert!(!excl.excludes_certificate(&good));
        assert!(!perm.permits_certificate(&bad));
    }
}
