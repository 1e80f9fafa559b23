//! Per-call traversal state shared by the engines.

use log::{trace, warn};
use xmap_dom::QName;
use xmap_schema::{FxHashSet, MemberDescriptor, Severity, TypeDescriptor, TypeRegistry};

use crate::error::{Error, ErrorList, MappingError, ReportedError, Result};
use crate::namespace::NamespaceRegistry;
use crate::options::SerializerOptions;

/// State of one top-level serialize or deserialize call.
pub(crate) struct Session<'a> {
    pub registry: &'a TypeRegistry,
    pub options: &'a SerializerOptions,
    pub errors: ErrorList,
    pub namespaces: NamespaceRegistry,
    /// Identities of the objects on the path from the root.
    pub call_stack: FxHashSet<usize>,
    /// Number of objects on the path from the root.
    pub depth: usize,
    /// While probing, conditions are recorded but never abort.
    probing: usize,
}

impl<'a> Session<'a> {
    pub fn new(registry: &'a TypeRegistry, options: &'a SerializerOptions) -> Self {
        Self {
            registry,
            options,
            errors: ErrorList::new(),
            namespaces: NamespaceRegistry::new(),
            call_stack: FxHashSet::default(),
            depth: 0,
            probing: 0,
        }
    }

    /// Record a condition, aborting if the exception policy says so.
    pub fn report(&mut self, error: MappingError, severity: Severity) -> Result<()> {
        if severity == Severity::Ignore {
            trace!("ignored: {}", error);
            return Ok(());
        }

        let reported = ReportedError { error, severity };
        if self.probing == 0 {
            warn!("{}", reported);
        }
        self.errors.push(reported.clone());
        if self.probing == 0 && self.options.exception_policy.aborts(severity) {
            return Err(Error::Aborted(reported));
        }
        Ok(())
    }

    /// Record a condition at the member's severity, or the default one.
    pub fn report_member(
        &mut self,
        member: Option<&MemberDescriptor>,
        error: MappingError,
    ) -> Result<()> {
        let severity = self.severity_of(member);
        self.report(error, severity)
    }

    /// Record a condition at the default severity.
    pub fn report_structural(&mut self, error: MappingError) -> Result<()> {
        self.report(error, self.options.default_severity)
    }

    /// Record a failed collection insertion; a warning unless the member
    /// sets its own severity.
    pub fn report_insertion(
        &mut self,
        member: Option<&MemberDescriptor>,
        container: String,
        reason: String,
    ) -> Result<()> {
        let severity = member
            .and_then(|m| m.severity)
            .unwrap_or(Severity::Warning);
        self.report(
            MappingError::InsertionFailure { container, reason },
            severity,
        )
    }

    pub fn severity_of(&self, member: Option<&MemberDescriptor>) -> Severity {
        member
            .map(|m| m.missing_severity(self.options.default_severity))
            .unwrap_or(self.options.default_severity)
    }

    /// Start recording into a scratch list with aborts disabled. Returns
    /// the list to hand back to [`Session::end_probe`].
    pub fn begin_probe(&mut self) -> ErrorList {
        self.probing += 1;
        std::mem::take(&mut self.errors)
    }

    pub fn is_probing(&self) -> bool {
        self.probing > 0
    }

    /// Restore the saved list and return what the probe recorded.
    pub fn end_probe(&mut self, saved: ErrorList) -> ErrorList {
        self.probing -= 1;
        std::mem::replace(&mut self.errors, saved)
    }

    /// Check whether null members are written for `desc`.
    pub fn serialize_nulls(&self, desc: &TypeDescriptor) -> bool {
        desc.serialize_nulls.unwrap_or(self.options.serialize_nulls)
    }

    /// Check whether default-valued members are skipped for `desc`.
    pub fn skip_defaults(&self, desc: &TypeDescriptor) -> bool {
        desc.skip_defaults.unwrap_or(self.options.skip_default_values)
    }

    pub fn real_type_name(&self) -> QName {
        QName::with_namespace(
            self.options.metadata_namespace.as_str(),
            self.options.real_type_attribute.as_str(),
        )
    }

    pub fn dims_name(&self) -> QName {
        QName::with_namespace(
            self.options.metadata_namespace.as_str(),
            self.options.dims_attribute.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionPolicy;
    use xmap_schema::{ClassDef, DataType, SchemaBuilder};

    fn registry() -> TypeRegistry {
        let mut builder = SchemaBuilder::new();
        builder.add_class(ClassDef::new("Quiet").serialize_nulls(false));
        builder.build().unwrap()
    }

    fn missing() -> MappingError {
        MappingError::MissingText {
            member: "Body".to_string(),
        }
    }

    #[test]
    fn test_report_follows_policy() {
        let registry = registry();
        let options = SerializerOptions::default();
        let mut session = Session::new(&registry, &options);

        session.report(missing(), Severity::Ignore).unwrap();
        assert!(session.errors.is_empty());
        session.report(missing(), Severity::Warning).unwrap();
        assert!(matches!(
            session.report(missing(), Severity::Error),
            Err(Error::Aborted(ReportedError { severity: Severity::Error, .. }))
        ));
        assert_eq!(session.errors.len(), 2);

        let options = SerializerOptions::default().exception_policy(ExceptionPolicy::DoNotThrow);
        let mut session = Session::new(&registry, &options);
        session.report(missing(), Severity::Error).unwrap();
        assert!(session.errors.has_errors());
    }

    #[test]
    fn test_probe_records_without_aborting() {
        let registry = registry();
        let options = SerializerOptions::default();
        let mut session = Session::new(&registry, &options);
        session.report(missing(), Severity::Warning).unwrap();

        let saved = session.begin_probe();
        assert!(session.is_probing());
        session.report_structural(missing()).unwrap();
        let scratch = session.end_probe(saved);

        assert!(!session.is_probing());
        assert_eq!(scratch.len(), 1);
        assert_eq!(session.errors.len(), 1);
        assert!(!session.errors.has_errors());
    }

    #[test]
    fn test_type_overrides_options() {
        let registry = registry();
        let options = SerializerOptions::default();
        let session = Session::new(&registry, &options);
        assert!(!session.serialize_nulls(&registry.descriptor(&DataType::class("Quiet"))));
        assert!(session.serialize_nulls(&registry.descriptor(&DataType::String)));
    }
}
