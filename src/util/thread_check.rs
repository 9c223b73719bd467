use std::thread::ThreadId;

#[cfg(not(feature = "no_thread_checks"))]
#[inline(always)]
pub(crate) fn do_thread_check(owner: ThreadId) {
    #[inline(never)]
    #[cold]
    fn do_thread_check_fail() {
        panic!("Transport must not be used on a different thread than it was created on");
    }

    if std::thread::current().id() != owner {
        do_thread_check_fail();
    }
}

#[cfg(feature = "no_thread_checks")]
#[inline(always)]
pub(crate) fn do_thread_check(_owner: ThreadId) {}
