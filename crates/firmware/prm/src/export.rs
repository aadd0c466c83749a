//! The `prm_module_export!` macro.

/// Builds a module's export descriptor at compile time and exports it under
/// the fixed symbol `PrmModuleExportDescriptor`.
///
/// Each handler is given as `(guid, name)`, where `name` is the export name
/// of the handler function. Names are checked while the static is
/// evaluated, so an invalid name or a duplicate GUID fails the build.
///
/// ```ignore
/// ember_prm::prm_module_export! {
///     platform_guid: PLATFORM_GUID,
///     module_guid: MODULE_GUID,
///     handlers: [
///         (DUMP_HANDLER_GUID, "DumpAddressTranslation"),
///     ],
/// }
/// ```
#[macro_export]
macro_rules! prm_module_export {
    (
        platform_guid: $platform:expr,
        module_guid: $module:expr,
        handlers: [ $( ($guid:expr, $name:literal) ),* $(,)? ] $(,)?
    ) => {
        #[used]
        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static PrmModuleExportDescriptor: $crate::PrmModuleExportDescriptor<
            { <[&str]>::len(&[$($name),*]) },
        > = $crate::PrmModuleExportDescriptor::new(
            $platform,
            $module,
            [$($crate::PrmHandlerExportDescriptor::new($guid, $name)),*],
        );
    };
}

#[cfg(test)]
mod tests {
    use ember_binparse::AsBytes;
    use ember_uefi::EfiGuid;

    use crate::ExportDescriptor;

    mod module {
        use super::EfiGuid;

        pub const PLATFORM: EfiGuid = EfiGuid::new(0xdead_beef, 1, 2, [3; 8]);

        crate::prm_module_export! {
            platform_guid: PLATFORM,
            module_guid: EfiGuid::new(0x5a5a_5a5a, 1, 2, [9; 8]),
            handlers: [
                (EfiGuid::new(0x10, 0, 0, [0; 8]), "PrmHandlerA"),
                (EfiGuid::new(0x20, 0, 0, [0; 8]), "PrmHandlerB"),
            ],
        }
    }

    #[test]
    fn exported_table_parses() {
        let bytes = module::PrmModuleExportDescriptor.as_bytes();
        let desc = ExportDescriptor::parse(bytes).unwrap();
        assert_eq!(desc.platform_guid(), module::PLATFORM);
        assert_eq!(desc.len(), 2);
        assert_eq!(desc.handler(1).unwrap().name(), Some("PrmHandlerB"));
    }
}
