//! An infinite scroll component for Yew.
//!
//! Items are loaded through a [`Loader`] and appended to the list whenever a
//! sentinel element after the last item becomes fully visible. At most one
//! load runs at a time; signals that arrive in the meantime are dropped.

mod error;
mod feed;
mod fetch;
mod intersection_observer;
mod record;
mod sensor;
mod single_flight;

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use futures::FutureExt;
use intersection_observer::{IntersectionObserver, ObservedElement};
use tracing::{debug, error, warn};
use wasm_bindgen_futures::spawn_local;
use web_sys::Element;
use yew::prelude::*;

pub use error::LoadError;
pub use feed::{Feed, LoadOutcome, Loader};
pub use fetch::{FetchLoader, POSTS_URL};
pub use record::Record;
pub use sensor::{ObservationHandle, Visibility, VisibilitySensor, FULLY_VISIBLE};
pub use single_flight::{FlightPermit, SingleFlight};

type ItemRenderer<T> = Callback<T, Html>;

struct SentinelShared {
    sensor: RefCell<VisibilitySensor<ObservedElement>>,
    on_visible: RefCell<Callback<()>>,
}

struct SentinelManager {
    observer: Option<IntersectionObserver>,
    shared: Rc<SentinelShared>,
}

impl SentinelManager {
    fn new(threshold: f64) -> Self {
        let sensor = VisibilitySensor::new(threshold);
        // the browser throws on thresholds outside 0..=1
        let threshold = sensor.threshold();
        let shared = Rc::new(SentinelShared {
            sensor: RefCell::new(sensor),
            on_visible: RefCell::default(),
        });
        let observer = {
            let shared = shared.clone();
            IntersectionObserver::new(threshold, move |entries| {
                let signals = shared.sensor.borrow().count_signals(
                    entries
                        .iter()
                        .map(|entry| (entry.target(), entry.visibility())),
                );
                if signals == 0 {
                    return;
                }
                let on_visible = shared.on_visible.borrow().clone();
                for _ in 0..signals {
                    on_visible.emit(());
                }
            })
        };
        let observer = match observer {
            Ok(observer) => Some(observer),
            Err(err) => {
                error!(?err, "could not create intersection observer");
                None
            }
        };
        SentinelManager { observer, shared }
    }

    fn set_on_visible(&self, on_visible: Callback<()>) {
        *self.shared.on_visible.borrow_mut() = on_visible;
    }

    fn sync(&self, marker: Option<Element>) {
        let Some(observer) = &self.observer else {
            return;
        };
        let mut sensor = self.shared.sensor.borrow_mut();
        match sensor.sync_with(marker, |el| observer.observe(el)) {
            Ok(true) => debug!("sentinel attached"),
            Ok(false) => {}
            Err(err) => warn!(?err, "could not observe sentinel"),
        }
    }

    fn teardown(&self) {
        if self.shared.sensor.borrow_mut().detach() {
            debug!("sentinel detached");
        }
    }
}

/// Calls `on_visible` each time the element behind `marker` scrolls into
/// view by at least `threshold` of its area.
///
/// The observation follows the node ref: a different element is observed as
/// soon as the ref points at it, and nothing is observed after unmount.
#[hook]
pub fn use_sentinel(marker: NodeRef, threshold: f64, on_visible: Callback<()>) {
    let manager = use_memo(|threshold| SentinelManager::new(*threshold), threshold);
    manager.set_on_visible(on_visible);
    {
        let manager = manager.clone();
        use_effect(move || {
            manager.sync(marker.cast::<Element>());
            || {}
        });
    }
    use_effect_with_deps(
        move |_| {
            move || {
                manager.teardown();
            }
        },
        threshold,
    );
}

#[derive(PartialEq, Properties)]
pub struct SentinelProps {
    pub onvisible: Callback<()>,
    #[prop_or(FULLY_VISIBLE)]
    pub threshold: f64,
    #[prop_or_default]
    pub classes: Classes,
    #[prop_or_default]
    pub style: Option<AttrValue>,
    /// Shown inside the sentinel, "Loading..." if empty
    #[prop_or_default]
    pub children: Children,
}

#[function_component]
pub fn Sentinel(props: &SentinelProps) -> Html {
    let marker = use_node_ref();
    use_sentinel(marker.clone(), props.threshold, props.onvisible.clone());

    let contents = if props.children.is_empty() {
        html! { "Loading..." }
    } else {
        html! { <>{ for props.children.iter() }</> }
    };
    html! {
        <div ref={marker} class={props.classes.clone()} style={props.style.clone()}>
            {contents}
        </div>
    }
}

/// Handle returned by [`use_infinite_scroll`].
pub struct UseInfiniteScrollHandle<T> {
    feed: Feed<T>,
    load_more: Callback<()>,
}

impl<T: 'static> UseInfiniteScrollHandle<T> {
    pub fn items(&self) -> Ref<'_, [T]> {
        self.feed.items()
    }

    pub fn is_loading(&self) -> bool {
        self.feed.is_loading()
    }

    pub fn last_error(&self) -> Option<LoadError> {
        self.feed.last_error()
    }

    /// Emitting starts a load unless one is already running.
    pub fn load_more(&self) -> Callback<()> {
        self.load_more.clone()
    }
}

/// Keeps an append-only feed of items loaded through `loader`.
///
/// The latest `loader` passed in is the one used by the next load. Loads
/// never overlap; a load that fails is logged and remembered in
/// [`UseInfiniteScrollHandle::last_error`] and does not block later loads.
#[hook]
pub fn use_infinite_scroll<T>(loader: Rc<dyn Loader<T>>) -> UseInfiniteScrollHandle<T>
where
    T: 'static,
{
    let update = use_force_update();
    let feed = use_memo(move |_| Feed::new(move || update.force_update()), ());

    let current_loader = use_mut_ref(|| loader.clone());
    *current_loader.borrow_mut() = loader;

    let load_more = {
        let feed = (*feed).clone();
        use_callback(
            move |(), _| {
                let loader = current_loader.borrow().clone();
                if let Some(pending) = feed.load_more(&*loader) {
                    spawn_local(pending.map(|_| ()));
                }
            },
            (),
        )
    };

    UseInfiniteScrollHandle {
        feed: (*feed).clone(),
        load_more,
    }
}

#[derive(Properties)]
pub struct InfiniteListProps<T: 'static> {
    pub loader: Rc<dyn Loader<T>>,
    pub item: ItemRenderer<T>,
    #[prop_or(FULLY_VISIBLE)]
    pub threshold: f64,
    #[prop_or_default]
    pub classes: Classes,
    #[prop_or_default]
    pub item_classes: Classes,
    #[prop_or_default]
    pub sentinel_classes: Classes,
    #[prop_or_default]
    pub sentinel_style: Option<AttrValue>,
    /// Contents of the sentinel
    #[prop_or_default]
    pub children: Children,
}

impl<T: 'static> PartialEq for InfiniteListProps<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.loader, &other.loader)
            && self.item == other.item
            && self.threshold == other.threshold
            && self.classes == other.classes
            && self.item_classes == other.item_classes
            && self.sentinel_classes == other.sentinel_classes
            && self.sentinel_style == other.sentinel_style
            && self.children == other.children
    }
}

/// Renders every loaded item followed by a sentinel that loads more when it
/// becomes visible.
#[function_component]
pub fn InfiniteList<T>(props: &InfiniteListProps<T>) -> Html
where
    T: Clone + 'static,
{
    let feed = use_infinite_scroll(props.loader.clone());

    let entries = feed
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            html! {
                <div key={i} class={props.item_classes.clone()}>
                    {props.item.emit(item.clone())}
                </div>
            }
        })
        .collect::<Html>();

    html! {
        <div class={props.classes.clone()}>
            {entries}
            <Sentinel
                onvisible={feed.load_more()}
                threshold={props.threshold}
                classes={props.sentinel_classes.clone()}
                style={props.sentinel_style.clone()}>
                {for props.children.iter()}
            </Sentinel>
        </div>
    }
}

#[derive(PartialEq, Properties)]
pub struct PostFeedProps {
    #[prop_or(AttrValue::Static(POSTS_URL))]
    pub url: AttrValue,
    #[prop_or(FULLY_VISIBLE)]
    pub threshold: f64,
    #[prop_or_default]
    pub classes: Classes,
}

fn post(record: Record) -> Html {
    html! {
        <>
            <h2>{record.title}</h2>
            <p>{record.body}</p>
        </>
    }
}

/// The post list: titles and bodies fetched from `url`, with a red
/// "Loading..." sentinel at the end.
#[function_component]
pub fn PostFeed(props: &PostFeedProps) -> Html {
    let loader = use_memo(
        |url| Rc::new(FetchLoader::new(url.as_str())) as Rc<dyn Loader<Record>>,
        props.url.clone(),
    );
    html! {
        <InfiniteList<Record>
            loader={(*loader).clone()}
            item={post}
            threshold={props.threshold}
            classes={props.classes.clone()}
            sentinel_style={"color: red;"} />
    }
}
