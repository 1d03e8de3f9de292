use tokio::sync::watch;

/// Mutable state container with change notification.
///
/// Subscribers are woken only when an update reports that it changed the value.
#[derive(Debug)]
pub struct Store<T> {
    tx: watch::Sender<T>,
}

impl<T> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn get(&self) -> watch::Ref<'_, T> {
        self.tx.borrow()
    }

    /// Run `f` on the value. `f` returns whether it changed anything.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn set(&self, value: T) -> bool
    where
        T: PartialEq,
    {
        self.update(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_only_real_changes() {
        let store = Store::new(1u32);
        let mut rx = store.subscribe();

        assert!(!store.set(1));
        assert!(!rx.has_changed().unwrap());

        assert!(store.update(|v| {
            *v += 1;
            true
        }));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
        assert_eq!(*store.get(), 2);
    }

    #[test]
    fn works_without_subscribers() {
        let store: Store<Vec<u8>> = Store::default();
        assert!(store.update(|v| {
            v.push(7);
            true
        }));
        assert_eq!(*store.get(), vec![7]);
    }
}
