/*!
 * Collections
 * Data structures whose readiness can be awaited by a process
 */

pub mod wait_list;

pub use wait_list::WaitList;
