use std::path::PathBuf;

xflags::xflags! {
    /// A blog generator.
    cmd wren {
        /// Build the site rooted at `input` into `output`.
        cmd build {
            required input: PathBuf
            required output: PathBuf
            /// Log every stage transition and discovered file.
            optional -v, --verbose
        }
    }
}
