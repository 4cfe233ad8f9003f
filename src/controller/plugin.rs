/*!
Controller plugin boundary: observers given `(request_found, req_it)`
after row-policy update, every tick (spec.md §4.2 step 10). Mirrors
`IControllerPlugin` in the filtered original's controller interface.
*/

use crate::request::Request;

pub trait ControllerPlugin {
    fn update(&mut self, request_found: bool, issued: Option<&Request>);
}
