pub(crate) mod free_list;
pub(crate) mod huge_alloc;
pub(crate) mod likely;
pub(crate) mod math;
pub(crate) mod thread_check;
