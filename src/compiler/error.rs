use crate::compiler::Location;

/// Represents all user facing errors that are generated from within the
/// Compiler module and its submodules.
///
/// This type captures the metadata which is necessarily present for
/// all errors which are caused by input source code: where in the source
/// the problem is.  The inner error carries the submodule specific details
/// and supplies the message.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilerError<IE: std::fmt::Display> {
    location: Option<Location>,
    inner: IE,
}

impl<IE> CompilerError<IE>
where
    IE: std::fmt::Display,
{
    pub fn new(location: Option<Location>, inner: IE) -> Self {
        CompilerError { location, inner }
    }

    pub fn inner(&self) -> &IE {
        &self.inner
    }

    pub fn into_inner(self) -> IE {
        self.inner
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }
}

impl<IE> std::fmt::Display for CompilerError<IE>
where
    IE: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some(loc) => f.write_fmt(format_args!("{}: {}", loc, self.inner)),
            None => f.write_fmt(format_args!("{}", self.inner)),
        }
    }
}
