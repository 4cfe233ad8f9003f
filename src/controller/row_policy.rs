/*!
The row-policy plug-in boundary: `IRowPolicy.update(request_found, req_it)`
(spec.md §6), invoked once per tick right after scheduling, before
plugins. The core ships an open-page policy (never closes a row on its
own -- bank eviction is left to the natural `RequireRowOpen` veto) since
nothing in spec.md or the filtered original source specifies a
closed-page variant's exact auto-precharge timing.
*/

use crate::request::Request;

pub trait RowPolicy {
    fn update(&mut self, request_found: bool, issued: Option<&Request>);
}

#[derive(Default)]
pub struct OpenPageRowPolicy;

impl RowPolicy for OpenPageRowPolicy {
    fn update(&mut self, _request_found: bool, _issued: Option<&Request>) {}
}
