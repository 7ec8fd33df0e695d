/// This macro is a wrapper around `tracing::trace!` and should not be confused with our snapshot
/// testing. The primary goal of this macro is to add the necessary context to logging statements
/// so that external tools (like the snapshot log visualizer) can show how various key data
/// structures evolve over the course of building the IR.
///
/// Pass the macro an identifier for the value you'd like to take a snapshot of. This will tag the
/// snapshot type with the type name of the value, create data that is a JSON string using
/// serde_json, and add the message literal that you pass in. EX:
/// ```text
/// snapshot!(merged, "absorbed fragment selections");
/// // Generates:
/// // trace!(snapshot = "MergedSelections", data = "{ .. }", "absorbed fragment selections");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value).expect(concat!(
                "Could not serialize value for a snapshot with message: ",
                $msg
            )),
            $msg
        );
    };
}

pub(crate) use snapshot;
