use identity::auth::SessionKey;
use identity::auth::types::ScopeSet;
use proptest::prelude::*;

// Realistic identifier alphabets: tenant/directory ids are GUIDs, credential
// ids are hex thumbprints, scope-set names are plain words. None of them can
// contain the key delimiter.
const COMPONENT: &str = "[a-zA-Z0-9-]{1,40}";

#[cfg(test)]
mod session_key_properties {
    use super::*;

    proptest! {
        #[test]
        fn key_derivation_collapses_case(
            tenant in COMPONENT,
            app in COMPONENT,
            credential in COMPONENT,
            scope in COMPONENT
        ) {
            let mixed = SessionKey::derive(&tenant, &app, &credential, &scope);
            let lower = SessionKey::derive(
                &tenant.to_lowercase(),
                &app.to_lowercase(),
                &credential.to_lowercase(),
                &scope.to_lowercase(),
            );
            let upper = SessionKey::derive(
                &tenant.to_uppercase(),
                &app.to_uppercase(),
                &credential.to_uppercase(),
                &scope.to_uppercase(),
            );

            // Property: case never affects key identity
            prop_assert_eq!(&mixed, &lower);
            prop_assert_eq!(&mixed, &upper);
        }

        #[test]
        fn distinct_tuples_produce_distinct_keys(
            a in (COMPONENT, COMPONENT, COMPONENT, COMPONENT),
            b in (COMPONENT, COMPONENT, COMPONENT, COMPONENT)
        ) {
            let normalize = |t: &(String, String, String, String)| {
                (
                    t.0.to_lowercase(),
                    t.1.to_lowercase(),
                    t.2.to_lowercase(),
                    t.3.to_lowercase(),
                )
            };
            prop_assume!(normalize(&a) != normalize(&b));

            let key_a = SessionKey::derive(&a.0, &a.1, &a.2, &a.3);
            let key_b = SessionKey::derive(&b.0, &b.1, &b.2, &b.3);

            // Property: semantically distinct tuples never collide
            prop_assert_ne!(key_a, key_b);
        }

        #[test]
        fn derivation_is_deterministic(
            tenant in COMPONENT,
            app in COMPONENT,
            credential in COMPONENT,
            scope in COMPONENT
        ) {
            let first = SessionKey::derive(&tenant, &app, &credential, &scope);
            let second = SessionKey::derive(&tenant, &app, &credential, &scope);
            prop_assert_eq!(first, second);
        }
    }
}

#[cfg(test)]
mod scope_set_properties {
    use super::*;

    proptest! {
        #[test]
        fn sharepoint_scopes_embed_tenant_and_domain(tenant in "[a-z0-9-]{1,40}") {
            for domain in [".com", ".us"] {
                let urls = ScopeSet::SharePoint.scope_urls(&tenant, domain);
                prop_assert_eq!(urls.len(), 1);
                prop_assert_eq!(
                    &urls[0],
                    &format!("https://{tenant}.sharepoint{domain}/.default")
                );
            }
        }

        #[test]
        fn every_scope_set_respects_the_authority_domain(tenant in "[a-z0-9-]{1,40}") {
            for scope_set in [
                ScopeSet::Graph,
                ScopeSet::SharePoint,
                ScopeSet::Exchange,
                ScopeSet::Management,
            ] {
                for domain in [".com", ".us"] {
                    for url in scope_set.scope_urls(&tenant, domain) {
                        // Property: the expanded host ends in the selected
                        // domain suffix
                        let host = url
                            .strip_prefix("https://")
                            .and_then(|rest| rest.split('/').next())
                            .unwrap_or_default();
                        prop_assert!(host.ends_with(domain.trim_start_matches('.')));
                    }
                }
            }
        }
    }
}
